//! Mesh data loading and procedural shapes.
//!
//! Loaded geometry arrives as JSON in the converter's output format:
//!
//! ```json
//! { "vertices": [x, y, z, ...],
//!   "vertexNormals": [x, y, z, ...],
//!   "indices": [a, b, c, ...] }
//! ```
//!
//! [`MeshData`] is the CPU-side intermediate: parse, validate, then
//! [`MeshData::upload`] to get a GPU [`Mesh`]. Validation failures are
//! descriptive [`AssetError`]s so a bad asset aborts startup with a message
//! instead of a draw-time panic.

use std::path::Path;

use serde::Deserialize;

use crate::error::AssetError;
use crate::gpu::Gpu;
use crate::mesh::Mesh;
use crate::uniform::UniformSet;

/// Raw indexed triangle geometry before GPU upload.
#[derive(Clone, Debug, Deserialize)]
pub struct MeshData {
    /// Flat `[x, y, z]` vertex positions.
    pub vertices: Vec<f32>,
    /// Flat `[x, y, z]` vertex normals, one per vertex.
    #[serde(rename = "vertexNormals")]
    pub vertex_normals: Vec<f32>,
    /// Triangle corner indices.
    pub indices: Vec<u16>,
}

impl MeshData {
    /// Parse mesh JSON from a string.
    pub fn from_json_str(what: &str, json: &str) -> Result<Self, AssetError> {
        let data: MeshData = serde_json::from_str(json).map_err(|source| AssetError::Parse {
            what: what.to_string(),
            source,
        })?;
        data.validate(what)?;
        Ok(data)
    }

    /// Read and parse a mesh JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&path.display().to_string(), &text)
    }

    /// Check the format contract: triple-aligned arrays, one normal per
    /// vertex, indices in range.
    pub fn validate(&self, what: &str) -> Result<(), AssetError> {
        if self.vertices.len() % 3 != 0 {
            return Err(AssetError::Malformed(format!(
                "{what}: vertex array length {} is not a multiple of 3",
                self.vertices.len()
            )));
        }
        if self.vertex_normals.len() != self.vertices.len() {
            return Err(AssetError::Malformed(format!(
                "{what}: {} normal components for {} vertex components",
                self.vertex_normals.len(),
                self.vertices.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(AssetError::Malformed(format!(
                "{what}: index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vertex_count = (self.vertices.len() / 3) as u32;
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&i| (i as u32) >= vertex_count)
        {
            return Err(AssetError::Malformed(format!(
                "{what}: index {bad} out of range for {vertex_count} vertices"
            )));
        }
        Ok(())
    }

    /// Number of vertices described.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Upload to the GPU as an indexed triangle mesh.
    pub fn upload(&self, gpu: &Gpu, label: &str, defaults: UniformSet) -> Mesh {
        Mesh::indexed(
            gpu,
            label,
            &self.vertices,
            &self.vertex_normals,
            &self.indices,
            defaults,
        )
    }

    /// A unit cube centered at the origin, four vertices per face so each
    /// face keeps its flat normal.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([ 0.0,  0.0,  1.0], [[-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5]]),
            ([ 0.0,  0.0, -1.0], [[ 0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5]]),
            ([ 0.0,  1.0,  0.0], [[-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5], [-0.5,  0.5, -0.5]]),
            ([ 0.0, -1.0,  0.0], [[-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5]]),
            ([ 1.0,  0.0,  0.0], [[ 0.5, -0.5,  0.5], [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5]]),
            ([-1.0,  0.0,  0.0], [[-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5]]),
        ];

        let mut vertices = Vec::with_capacity(6 * 4 * 3);
        let mut normals = Vec::with_capacity(6 * 4 * 3);
        let mut indices = Vec::with_capacity(6 * 6);
        for (face, (normal, corners)) in faces.iter().enumerate() {
            let base = (face * 4) as u16;
            for corner in corners {
                vertices.extend_from_slice(corner);
                normals.extend_from_slice(normal);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self {
            vertices,
            vertex_normals: normals,
            indices,
        }
    }

    /// A square plane of the given size on the XZ axis, normals up.
    pub fn plane(size: f32) -> Self {
        let half = size * 0.5;
        Self {
            vertices: vec![
                -half, 0.0, -half, half, 0.0, -half, half, 0.0, half, -half, 0.0, half,
            ],
            vertex_normals: vec![
                0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_converter_output() {
        let json = r#"{
            "vertices": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            "vertexNormals": [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            "indices": [0, 1, 2]
        }"#;
        let data = MeshData::from_json_str("triangle", json).unwrap();
        assert_eq!(data.vertex_count(), 3);
        assert_eq!(data.indices, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_mismatched_normals() {
        let json = r#"{
            "vertices": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            "vertexNormals": [0.0, 0.0, 1.0],
            "indices": [0, 1, 2]
        }"#;
        let err = MeshData::from_json_str("triangle", json).unwrap_err();
        assert!(err.to_string().contains("normal components"));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let json = r#"{
            "vertices": [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            "vertexNormals": [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            "indices": [0, 1, 7]
        }"#;
        let err = MeshData::from_json_str("triangle", json).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = MeshData::from_json_str("garbage", "not json").unwrap_err();
        assert!(matches!(err, AssetError::Parse { .. }));
    }

    #[test]
    fn cube_is_a_valid_mesh() {
        let cube = MeshData::cube();
        cube.validate("cube").unwrap();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36);
    }

    #[test]
    fn plane_is_a_valid_mesh() {
        let plane = MeshData::plane(10.0);
        plane.validate("plane").unwrap();
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.vertices[0], -5.0);
    }
}
