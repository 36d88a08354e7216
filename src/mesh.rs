//! GPU-resident mesh buffers.
//!
//! A [`Mesh`] owns one buffer per vertex attribute stream — positions,
//! normals, and optionally per-vertex colors — plus an optional u16 index
//! buffer. The two buffer shapes of the original survive as one struct with
//! a tag: meshes with an index buffer draw with `draw_indexed` (loaded
//! triangle geometry), meshes without draw with `draw` over the raw vertex
//! range (line primitives, procedural shapes). The tag is
//! [`DrawMode`]; there is no inheritance chain and no virtual dispatch.
//!
//! Meshes are program-agnostic: binding consults the active program's
//! attribute-slot table, so the same mesh draws under the shadow program
//! (positions only) and the composite program (positions, normals, colors)
//! without changes.
//!
//! Buffer lifetime is explicit: [`Mesh::release`] destroys the GPU buffers
//! and is safe to call more than once. Meshes are shared read-only across
//! models via `Rc`, so release happens at scene teardown after every owner
//! is gone.

use std::collections::BTreeMap;

use wgpu::util::DeviceExt;

use crate::gpu::Gpu;
use crate::uniform::UniformSet;

/// Primitive mode a mesh draws with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Triangles,
    Lines,
}

struct IndexBuffer {
    buffer: wgpu::Buffer,
    count: u32,
}

/// An immutable set of GPU buffers plus draw metadata and mesh-tier uniform
/// defaults.
pub struct Mesh {
    label: String,
    vertex_buf: wgpu::Buffer,
    normal_buf: wgpu::Buffer,
    index: Option<IndexBuffer>,
    vertex_count: u32,
    mode: DrawMode,
    defaults: UniformSet,
    released: bool,
}

impl Mesh {
    /// Upload an indexed triangle mesh.
    ///
    /// `vertices` and `normals` are flat `[x, y, z]` triples of equal
    /// length; `indices` are u16 triangle corners.
    ///
    /// # Panics
    ///
    /// Panics on mismatched array lengths or out-of-range indices; loaders
    /// validate first (see [`crate::assets::MeshData::validate`]), so a
    /// violation here is a programming error.
    pub fn indexed(
        gpu: &Gpu,
        label: &str,
        vertices: &[f32],
        normals: &[f32],
        indices: &[u16],
        defaults: UniformSet,
    ) -> Self {
        assert_eq!(vertices.len() % 3, 0, "vertices must be flat xyz triples");
        assert_eq!(
            normals.len(),
            vertices.len(),
            "one normal per vertex required"
        );
        let vertex_count = (vertices.len() / 3) as u32;
        assert!(
            indices.iter().all(|&i| (i as u32) < vertex_count),
            "index out of range"
        );

        let (vertex_buf, normal_buf) = Self::upload_streams(gpu, label, vertices, normals);
        let index_buf = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} indices")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            label: label.to_string(),
            vertex_buf,
            normal_buf,
            index: Some(IndexBuffer {
                buffer: index_buf,
                count: indices.len() as u32,
            }),
            vertex_count,
            mode: DrawMode::Triangles,
            defaults,
            released: false,
        }
    }

    /// Upload a non-indexed line-list mesh.
    ///
    /// When `normals` is `None` a constant placeholder normal is generated
    /// per vertex so the attribute stream always exists.
    pub fn lines(
        gpu: &Gpu,
        label: &str,
        vertices: &[f32],
        normals: Option<&[f32]>,
        defaults: UniformSet,
    ) -> Self {
        assert_eq!(vertices.len() % 3, 0, "vertices must be flat xyz triples");
        assert_eq!(
            (vertices.len() / 3) % 2,
            0,
            "line lists need an even vertex count"
        );
        let generated;
        let normals = match normals {
            Some(n) => {
                assert_eq!(n.len(), vertices.len(), "one normal per vertex required");
                n
            }
            None => {
                generated = vec![1.0 / 3.0; vertices.len()];
                &generated
            }
        };

        let (vertex_buf, normal_buf) = Self::upload_streams(gpu, label, vertices, normals);

        Self {
            label: label.to_string(),
            vertex_buf,
            normal_buf,
            index: None,
            vertex_count: (vertices.len() / 3) as u32,
            mode: DrawMode::Lines,
            defaults,
            released: false,
        }
    }

    /// A single line segment from `start` to `end`.
    pub fn line(gpu: &Gpu, label: &str, start: glam::Vec3, end: glam::Vec3) -> Self {
        let vertices = [start.x, start.y, start.z, end.x, end.y, end.z];
        Self::lines(gpu, label, &vertices, None, UniformSet::new())
    }

    /// The three coordinate axes as line segments from the origin out to
    /// `length` along +X, +Y, +Z. Helper geometry for orientation; draw it
    /// with lighting off and leave it out of the shadow pass.
    pub fn axes(gpu: &Gpu, label: &str, length: f32) -> Self {
        #[rustfmt::skip]
        let vertices = [
            0.0, 0.0, 0.0,  length, 0.0, 0.0,
            0.0, 0.0, 0.0,  0.0, length, 0.0,
            0.0, 0.0, 0.0,  0.0, 0.0, length,
        ];
        let mut defaults = UniformSet::new();
        defaults.insert(
            "lighting_on".to_string(),
            crate::uniform::UniformValue::Int(0),
        );
        Self::lines(gpu, label, &vertices, None, defaults)
    }

    fn upload_streams(
        gpu: &Gpu,
        label: &str,
        vertices: &[f32],
        normals: &[f32],
    ) -> (wgpu::Buffer, wgpu::Buffer) {
        let vertex_buf = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} vertices")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let normal_buf = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} normals")),
                contents: bytemuck::cast_slice(normals),
                usage: wgpu::BufferUsages::VERTEX,
            });
        (vertex_buf, normal_buf)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Draw length: index count when indexed, vertex count otherwise.
    pub fn draw_len(&self) -> u32 {
        match &self.index {
            Some(ib) => ib.count,
            None => self.vertex_count,
        }
    }

    /// Mesh-tier uniform defaults stored with the geometry.
    pub fn defaults(&self) -> &UniformSet {
        &self.defaults
    }

    /// Bind the attribute streams this program declares, using its
    /// name-to-slot table, plus the caller's per-model color buffer when a
    /// `color` attribute exists. Binds the index buffer last when present.
    pub(crate) fn bind(
        &self,
        pass: &mut wgpu::RenderPass,
        attributes: &BTreeMap<String, u32>,
        color_buf: Option<&wgpu::Buffer>,
    ) {
        assert!(!self.released, "mesh '{}' used after release", self.label);
        if let Some(&slot) = attributes.get("position") {
            pass.set_vertex_buffer(slot, self.vertex_buf.slice(..));
        }
        if let Some(&slot) = attributes.get("normal") {
            pass.set_vertex_buffer(slot, self.normal_buf.slice(..));
        }
        if let (Some(&slot), Some(colors)) = (attributes.get("color"), color_buf) {
            pass.set_vertex_buffer(slot, colors.slice(..));
        }
        if let Some(ib) = &self.index {
            pass.set_index_buffer(ib.buffer.slice(..), wgpu::IndexFormat::Uint16);
        }
    }

    /// Issue the draw call for this mesh's shape and length.
    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass) {
        match &self.index {
            Some(ib) => pass.draw_indexed(0..ib.count, 0, 0..1),
            None => pass.draw(0..self.vertex_count, 0..1),
        }
    }

    /// Destroy the GPU buffers. Idempotent; the mesh must not be drawn
    /// afterwards.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.vertex_buf.destroy();
        self.normal_buf.destroy();
        if let Some(ib) = &self.index {
            ib.buffer.destroy();
        }
        self.released = true;
    }

    /// Whether [`Mesh::release`] has run.
    pub fn is_released(&self) -> bool {
        self.released
    }
}
