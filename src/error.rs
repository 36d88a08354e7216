//! Error types for startup, asset loading, and per-frame rendering.

use std::path::PathBuf;

/// Errors surfaced while loading external assets (mesh data, scene
/// definitions).
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// The data parsed but violates the mesh/scene format contract
    /// (mismatched array lengths, out-of-range indices, unknown names).
    #[error("malformed asset data: {0}")]
    Malformed(String),
}

/// Top-level renderer error.
///
/// Startup errors (`Init`, `ShaderCompile`, `Asset`) short-circuit the load
/// phase before the tick loop ever starts. `Surface` errors occur per frame
/// and halt the loop (fail-stop; restart the app to recover).
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer initialization failed: {0}")]
    Init(String),

    #[error("shader program '{name}' failed to compile: {message}")]
    ShaderCompile { name: String, message: String },

    #[error("unknown shader program '{0}'")]
    UnknownProgram(String),

    #[error("unknown mesh '{0}'")]
    UnknownMesh(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}
