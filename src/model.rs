//! A model: one shared mesh, an owned color, an owned transform, and
//! per-model uniform overrides.

use std::rc::Rc;

use glam::Vec4;
use wgpu::util::DeviceExt;

use crate::gpu::Gpu;
use crate::mesh::Mesh;
use crate::transform::World;
use crate::uniform::{UniformSet, UniformValue};

/// One drawable: a shared [`Mesh`] plus everything this instance owns —
/// its color (expanded to a per-vertex color buffer), its [`World`], and
/// its model-tier uniform overrides.
pub struct Model {
    mesh: Rc<Mesh>,
    color: Vec4,
    color_buf: wgpu::Buffer,
    /// The model's transform, mutated freely by animation callbacks.
    pub world: World,
    /// Model-tier overrides (e.g. `specular_exp`), merged over the
    /// program's model defaults at draw time.
    pub uniforms: UniformSet,
}

impl Model {
    /// Create a model over a shared mesh. The color is expanded into a
    /// vertex color buffer sized to the mesh so the color attribute stream
    /// always matches the geometry.
    pub fn new(gpu: &Gpu, mesh: Rc<Mesh>, color: Vec4, world: World, uniforms: UniformSet) -> Self {
        let color_buf = Self::upload_color(gpu, &mesh, color);
        Self {
            mesh,
            color,
            color_buf,
            world,
            uniforms,
        }
    }

    fn upload_color(gpu: &Gpu, mesh: &Mesh, color: Vec4) -> wgpu::Buffer {
        let data: Vec<[f32; 4]> = vec![color.to_array(); mesh.vertex_count() as usize];
        gpu.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} colors", mesh.label())),
                contents: bytemuck::cast_slice(&data),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
    }

    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Replace the model color, rewriting the vertex color buffer in place.
    pub fn set_color(&mut self, gpu: &Gpu, color: Vec4) {
        self.color = color;
        let data: Vec<[f32; 4]> = vec![color.to_array(); self.mesh.vertex_count() as usize];
        gpu.queue
            .write_buffer(&self.color_buf, 0, bytemuck::cast_slice(&data));
    }

    pub(crate) fn color_buffer(&self) -> &wgpu::Buffer {
        &self.color_buf
    }

    /// Model-tier uniform values for a draw: the transform's four factors
    /// as matrices, with this model's overrides merged on top.
    pub fn tier_values(&self) -> UniformSet {
        let mut values = UniformSet::new();
        values.insert(
            "world_base".to_string(),
            UniformValue::Mat4(self.world.base()),
        );
        values.insert(
            "world_scale".to_string(),
            UniformValue::Mat4(self.world.scale_matrix()),
        );
        values.insert(
            "world_rotation".to_string(),
            UniformValue::Mat4(self.world.rotation()),
        );
        values.insert(
            "world_translation".to_string(),
            UniformValue::Mat4(self.world.translation_matrix()),
        );
        for (name, value) in &self.uniforms {
            values.insert(name.clone(), value.clone());
        }
        values
    }
}
