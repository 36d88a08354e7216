//! Variance shadow map pass.
//!
//! Renders every shadow-casting object from the diffuse light camera's
//! view into a two-channel moments target: each texel stores the light-space
//! depth and its square. Later passes blur the moments and build a
//! summed-area table over them; the composite pass turns a rectangle
//! average of the moments into a Chebyshev visibility bound.

use crate::error::RenderError;
use crate::gpu::{DEPTH_FORMAT, Gpu};
use crate::pipeline::targets::OffscreenTarget;
use crate::pipeline::{SlotCursor, encode_object_draws};
use crate::program::ProgramCache;
use crate::scene::Scene;
use crate::uniform::UniformSet;

/// Shadow map edge length in texels. The SAT pass spans a full axis in two
/// iterations of sixteen taps, so this stays 16 × 16.
pub const SHADOW_MAP_SIZE: u32 = 256;

/// Moments format: depth in `r`, depth squared in `g`.
pub const MOMENTS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;

/// Name of the shadow program in the cache.
pub const SHADOW_PROGRAM: &str = "shadow";

pub struct ShadowPass {
    /// Moments output, consumed by the blur pass.
    pub moments: OffscreenTarget,
    depth: OffscreenTarget,
}

impl ShadowPass {
    pub fn new(gpu: &Gpu) -> Self {
        Self {
            moments: OffscreenTarget::new(
                gpu,
                "shadow moments",
                SHADOW_MAP_SIZE,
                SHADOW_MAP_SIZE,
                MOMENTS_FORMAT,
            ),
            depth: OffscreenTarget::new(
                gpu,
                "shadow depth",
                SHADOW_MAP_SIZE,
                SHADOW_MAP_SIZE,
                DEPTH_FORMAT,
            ),
        }
    }

    /// Encode the pass: clear the moments target to "infinitely far"
    /// (depth 1) and draw the shadow-casting subset of the scene from the
    /// light's view. Helper objects are excluded by their `casts_shadows`
    /// flag rather than being hidden and restored.
    pub fn encode(
        &self,
        gpu: &Gpu,
        cache: &mut ProgramCache,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        scene_values: &UniformSet,
        cursor: &mut SlotCursor,
    ) -> Result<(), RenderError> {
        cache.begin_pass();
        cache.use_program(SHADOW_PROGRAM)?;
        let program = cache.program(SHADOW_PROGRAM)?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.moments.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 1.0,
                        g: 1.0,
                        b: 0.0,
                        a: 0.0,
                    }),
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

        encode_object_draws(
            &mut pass,
            gpu,
            cache,
            program,
            scene,
            scene_values,
            true,
            cursor,
        );
        Ok(())
    }
}
