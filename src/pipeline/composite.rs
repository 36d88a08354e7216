//! Final composite pass: the visible scene with lighting and shadow
//! lookups, rendered to the surface.

use crate::error::RenderError;
use crate::gpu::{DEPTH_FORMAT, Gpu};
use crate::pipeline::targets::OffscreenTarget;
use crate::pipeline::{SlotCursor, encode_object_draws};
use crate::program::ProgramCache;
use crate::scene::Scene;
use crate::uniform::UniformSet;

/// Name of the composite program in the cache.
pub const SCENE_PROGRAM: &str = "scene";

pub struct CompositePass {
    depth: OffscreenTarget,
    /// Clear color behind the scene.
    pub clear_color: wgpu::Color,
}

impl CompositePass {
    pub fn new(gpu: &Gpu) -> Self {
        Self {
            depth: OffscreenTarget::new(
                gpu,
                "composite depth",
                gpu.width(),
                gpu.height(),
                DEPTH_FORMAT,
            ),
            clear_color: wgpu::Color::BLACK,
        }
    }

    /// Match the depth buffer to the surface after a resize.
    pub fn resize(&mut self, gpu: &Gpu) {
        self.depth
            .ensure_size(gpu, "composite depth", gpu.width(), gpu.height());
    }

    /// Encode the pass: bind the processed shadow table, clear color and
    /// depth, and draw every visible model of every object.
    pub fn encode(
        &self,
        gpu: &Gpu,
        cache: &mut ProgramCache,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        scene_values: &UniformSet,
        shadow_table: &wgpu::TextureView,
        surface_view: &wgpu::TextureView,
        cursor: &mut SlotCursor,
    ) -> Result<(), RenderError> {
        cache.begin_pass();
        cache.use_program(SCENE_PROGRAM)?;
        let program = cache.program(SCENE_PROGRAM)?;
        let shadow_bind_group = program
            .shadow_bind_group(gpu, shadow_table)
            .expect("scene program declares a shadow input");

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(1, &shadow_bind_group, &[]);
        encode_object_draws(
            &mut pass,
            gpu,
            cache,
            program,
            scene,
            scene_values,
            false,
            cursor,
        );
        Ok(())
    }
}
