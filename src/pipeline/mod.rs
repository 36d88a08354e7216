//! The multi-pass render pipeline.
//!
//! Each tick executes a fixed sequence of passes over the scene:
//!
//! 1. **Shadow**: moments (depth, depth²) of every shadow caster from the
//!    light camera's view, into an offscreen target.
//! 2. **Blur**: separable Gaussian over the moments, two directional
//!    sub-passes.
//! 3. **SAT**: summed-area table over the blurred moments, two directional
//!    sub-passes iterated twice each, ping-ponging between two targets.
//! 4. **Composite**: the visible scene with lighting and a Chebyshev
//!    shadow bound from the table, to the surface.
//!
//! Passes communicate only through their texture hand-offs. Viewport and
//! clear state is carried by each pass's own descriptor, so no pass can
//! leak state into the next. A pass failure propagates out of
//! [`RenderPipeline::execute`] and aborts the remainder of the frame.

mod composite;
mod filter;
mod shadow;
mod targets;

pub use composite::{CompositePass, SCENE_PROGRAM};
pub use filter::{FilterPass, SAT_ITERATIONS, SAT_TAPS};
pub use shadow::{MOMENTS_FORMAT, SHADOW_MAP_SIZE, SHADOW_PROGRAM, ShadowPass};
pub use targets::OffscreenTarget;

use glam::{Mat4, Vec3};

use crate::error::RenderError;
use crate::gpu::Gpu;
use crate::mesh::DrawMode;
use crate::program::{CompiledProgram, ProgramCache, ProgramDesc};
use crate::scene::Scene;
use crate::uniform::{
    UniformDef, UniformSet, UniformTier, UniformType, UniformValue, resolve_tier,
};

/// Hands out uniform-arena slots across the frame's passes.
pub(crate) struct SlotCursor {
    next: u32,
}

impl SlotCursor {
    fn new() -> Self {
        Self { next: 0 }
    }

    fn take(&mut self) -> u32 {
        let slot = self.next;
        self.next += 1;
        slot
    }
}

/// Draw every (visible) model of every object with `program`.
///
/// Per draw: resolve all four uniform tiers (`forced ?? supplied ??
/// default`), serialize the block into a fresh arena slot, bind it with the
/// slot's dynamic offset, bind the mesh's attribute streams through the
/// program's slot table, and issue the mesh's own draw call. The pipeline
/// variant (triangles/lines) only rebinds when the mesh mode changes.
#[allow(clippy::too_many_arguments)]
pub(crate) fn encode_object_draws(
    pass: &mut wgpu::RenderPass,
    gpu: &Gpu,
    cache: &ProgramCache,
    program: &CompiledProgram,
    scene: &Scene,
    scene_values: &UniformSet,
    shadow_casters_only: bool,
    cursor: &mut SlotCursor,
) {
    let mut bound_mode: Option<DrawMode> = None;
    let mut resolved = Vec::new();
    let mut block = vec![0u8; program.layout.block_size];

    for (_, object) in scene.objects() {
        if shadow_casters_only && !object.casts_shadows {
            continue;
        }
        let object_values = object.tier_values();

        for item in object.draw_list() {
            let mesh = item.model.mesh();
            if bound_mode != Some(mesh.mode()) {
                pass.set_pipeline(program.pipeline_for(mesh.mode()));
                bound_mode = Some(mesh.mode());
            }

            // The draw item's resolved object matrix wins over the object's
            // stored one (identity for models opting out of the shared
            // placement).
            let mut object_values = object_values.clone();
            object_values.insert(
                "obj_world".to_string(),
                UniformValue::Mat4(item.obj_world),
            );

            resolved.clear();
            resolve_tier(
                &program.layout.scene,
                scene.forced(UniformTier::Scene),
                Some(scene_values),
                &mut resolved,
            );
            resolve_tier(
                &program.layout.object,
                scene.forced(UniformTier::Object),
                Some(&object_values),
                &mut resolved,
            );
            resolve_tier(
                &program.layout.model,
                scene.forced(UniformTier::Model),
                Some(&item.model.tier_values()),
                &mut resolved,
            );
            resolve_tier(
                &program.layout.mesh,
                scene.forced(UniformTier::Mesh),
                Some(mesh.defaults()),
                &mut resolved,
            );

            block.fill(0);
            for uniform in &resolved {
                uniform.write(&mut block);
            }
            let slot = cursor.take();
            cache.write_slot(gpu, slot, &block);
            pass.set_bind_group(
                0,
                program.block_bind_group(),
                &[cache.slot_offset(slot)],
            );

            mesh.bind(pass, &program.attributes, Some(item.model.color_buffer()));
            mesh.draw(pass);
        }
    }
}

/// Uniform declarations for the composite program, in block order.
fn scene_program_uniforms() -> Vec<UniformDef> {
    use UniformTier::*;
    vec![
        UniformDef::new(Scene, "perspective", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Scene, "model_view", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Scene, "light_model_view", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Scene, "light_perspective", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Scene, "light_dir", UniformType::Vec3, UniformValue::Vec3(Vec3::NEG_Y)),
        UniformDef::new(Scene, "ambient_int", UniformType::Float, UniformValue::Float(0.25)),
        UniformDef::new(Scene, "camera_pos", UniformType::Vec3, UniformValue::Vec3(Vec3::ZERO)),
        UniformDef::new(Scene, "shadows_on", UniformType::Int, UniformValue::Int(1)),
        UniformDef::new(Object, "obj_world", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "world_base", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "world_scale", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "world_rotation", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "world_translation", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "specular_exp", UniformType::Float, UniformValue::Float(8.0)),
        UniformDef::new(Model, "specular_int", UniformType::Float, UniformValue::Float(0.0)),
        UniformDef::new(Mesh, "lighting_on", UniformType::Int, UniformValue::Int(1)),
    ]
}

/// Uniform declarations for the shadow program, in block order.
fn shadow_program_uniforms() -> Vec<UniformDef> {
    use UniformTier::*;
    vec![
        UniformDef::new(Scene, "light_perspective", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Scene, "light_model_view", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Object, "obj_world", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "world_base", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "world_scale", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "world_rotation", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
        UniformDef::new(Model, "world_translation", UniformType::Mat4, UniformValue::Mat4(Mat4::IDENTITY)),
    ]
}

/// The pass sequence plus the offscreen plumbing between passes.
pub struct RenderPipeline {
    shadow: ShadowPass,
    filter: FilterPass,
    composite: CompositePass,
}

impl RenderPipeline {
    /// Compile the scene and shadow programs into the cache and build every
    /// pass and offscreen target.
    pub fn new(gpu: &Gpu, cache: &mut ProgramCache) -> Result<Self, RenderError> {
        cache.insert(
            gpu,
            ProgramDesc {
                name: SCENE_PROGRAM,
                source: include_str!("../shaders/scene.wgsl"),
                attributes: &["position", "normal", "color"],
                uniforms: scene_program_uniforms(),
                color_format: gpu.config.format,
                depth: true,
                with_lines: true,
                shadow_input: true,
            },
        )?;
        cache.insert(
            gpu,
            ProgramDesc {
                name: SHADOW_PROGRAM,
                source: include_str!("../shaders/shadow.wgsl"),
                attributes: &["position"],
                uniforms: shadow_program_uniforms(),
                color_format: MOMENTS_FORMAT,
                depth: true,
                with_lines: false,
                shadow_input: false,
            },
        )?;

        let shadow = ShadowPass::new(gpu);
        let filter = FilterPass::new(gpu, &shadow.moments);
        let composite = CompositePass::new(gpu);
        Ok(Self {
            shadow,
            filter,
            composite,
        })
    }

    /// Background color of the composite pass.
    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.composite.clear_color = color;
    }

    /// Track a surface resize.
    pub fn resize(&mut self, gpu: &Gpu) {
        self.composite.resize(gpu);
    }

    /// Execute the full pass sequence for one tick and present.
    pub fn execute(
        &mut self,
        gpu: &Gpu,
        cache: &mut ProgramCache,
        scene: &mut Scene,
    ) -> Result<(), RenderError> {
        // Everything draws twice (shadow + composite) at worst; size the
        // uniform arena before any slot is taken.
        cache.ensure_slots(gpu, scene.draw_count().max(1) * 2);

        // View matrices resolve once per tick, through the cameras' caches.
        let camera_view = scene.camera.view_matrix();
        let camera_perspective = scene.camera.perspective(gpu.aspect());
        let light_view = scene.light.view_matrix();
        let light_perspective = scene.light.perspective(1.0);
        let light_dir = scene.light_dir();
        let camera_pos = scene.camera.pos();

        let mut shadow_values = UniformSet::new();
        shadow_values.insert(
            "light_perspective".to_string(),
            UniformValue::Mat4(light_perspective),
        );
        shadow_values.insert(
            "light_model_view".to_string(),
            UniformValue::Mat4(light_view),
        );

        let mut scene_values = UniformSet::new();
        scene_values.insert(
            "perspective".to_string(),
            UniformValue::Mat4(camera_perspective),
        );
        scene_values.insert("model_view".to_string(), UniformValue::Mat4(camera_view));
        scene_values.insert(
            "light_model_view".to_string(),
            UniformValue::Mat4(light_view),
        );
        scene_values.insert(
            "light_perspective".to_string(),
            UniformValue::Mat4(light_perspective),
        );
        scene_values.insert("light_dir".to_string(), UniformValue::Vec3(light_dir));
        scene_values.insert("camera_pos".to_string(), UniformValue::Vec3(camera_pos));

        let output = gpu.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        let mut cursor = SlotCursor::new();
        self.shadow.encode(
            gpu,
            cache,
            &mut encoder,
            scene,
            &shadow_values,
            &mut cursor,
        )?;
        self.filter.encode(&mut encoder);
        self.composite.encode(
            gpu,
            cache,
            &mut encoder,
            scene,
            &scene_values,
            self.filter.output(),
            &surface_view,
            &mut cursor,
        )?;

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
