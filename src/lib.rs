//! # Sundial
//!
//! A small multi-pass 3D scene renderer built on wgpu: composable
//! transforms, a look-at camera with a cached view matrix, a four-tier
//! shader-uniform binding layer, and a shadow pipeline that filters a
//! variance shadow map through a summed-area table.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use sundial::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     run(AppConfig::new().title("Spinning cube"), |gpu, _programs| {
//!         let mut scene = Scene::new(
//!             Camera::new(Vec3::new(0.0, 4.0, 12.0), Vec3::ZERO, Vec3::Y),
//!             Camera::new(Vec3::new(8.0, 20.0, 8.0), Vec3::ZERO, Vec3::Y),
//!         );
//!
//!         let cube = scene.add_mesh(
//!             "cube",
//!             MeshData::cube().upload(gpu, "cube", UniformSet::new()),
//!         );
//!
//!         let model = Model::new(gpu, cube, Vec4::ONE, World::new(), UniformSet::new());
//!         let mut models = BTreeMap::new();
//!         models.insert("body".to_string(), ModelEntry::new(model));
//!         scene.add_object(
//!             "spinner",
//!             SceneObject::new(models).with_update(Box::new(|obj, dt| {
//!                 obj.world.rotate_y(dt);
//!             })),
//!         );
//!
//!         Ok((scene, KeyBindings::default()))
//!     })
//! }
//! ```
//!
//! ## Structure
//!
//! - [`World`] — composable transform (`translate · rotate · scale · base`)
//!   with `save_as_base` for freezing placements.
//! - [`Camera`] — pos/look/up with a dirty-flagged view matrix and
//!   orbit/zoom/yaw/tilt/roll mutators.
//! - [`Mesh`], [`Model`], [`SceneObject`], [`Scene`] — geometry sharing and
//!   the scene graph.
//! - [`ProgramCache`] and the uniform tiers — shader programs with
//!   declared attribute slots and `forced ?? supplied ?? default` uniform
//!   resolution per draw.
//! - [`RenderPipeline`] — shadow moments, separable blur, summed-area
//!   table, composite.
//! - [`run`] — two-phase startup, then a fixed ~15 ms tick with keyboard
//!   bindings; fail-stop on frame errors.

mod app;
mod assets;
mod camera;
mod config;
mod error;
mod gpu;
mod input;
mod mesh;
mod model;
mod pipeline;
mod program;
mod scene;
mod scene_object;
mod transform;
mod uniform;

pub use app::{AppConfig, SetupFn, run};
pub use assets::MeshData;
pub use camera::{Camera, MIN_LOOK_DISTANCE};
pub use config::{
    ModelDef, RotationDef, SceneDef, SceneObjectDef, TransformDef, UniformValueDef,
    UpdateRegistry, build_scene,
};
pub use error::{AssetError, RenderError};
pub use gpu::{DEPTH_FORMAT, Gpu};
pub use input::{Action, Binding, CameraAction, InputState, KeyBindings, Trigger};
pub use mesh::{DrawMode, Mesh};
pub use model::Model;
pub use pipeline::{
    MOMENTS_FORMAT, OffscreenTarget, RenderPipeline, SAT_ITERATIONS, SAT_TAPS, SCENE_PROGRAM,
    SHADOW_MAP_SIZE, SHADOW_PROGRAM,
};
pub use program::{CompiledProgram, ProgramCache, ProgramDesc};
pub use scene::Scene;
pub use scene_object::{DrawItem, ModelEntry, ModelFlags, SceneObject, UpdateFn};
pub use transform::{World, rotation_about_line};
pub use uniform::{
    TierLayout, Uniform, UniformDef, UniformSet, UniformSlot, UniformTier, UniformType,
    UniformValue, UniformsLayout, resolve_tier,
};

// Math and key-code re-exports for downstream convenience.
pub use glam::{Mat2, Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
pub use winit::keyboard::KeyCode;
