//! Shadow-map filtering: separable blur and summed-area-table generation.
//!
//! Both filters are full-screen passes over the moments texture, wired as a
//! fixed chain of sub-passes ping-ponging between two targets:
//!
//! ```text
//! moments ─ blur x ─▶ ping ─ blur y ─▶ pong
//!   pong ─ sat rows (stride 1)  ─▶ ping
//!   ping ─ sat rows (stride 16) ─▶ pong
//!   pong ─ sat cols (stride 1)  ─▶ ping
//!   ping ─ sat cols (stride 16) ─▶ pong   ◀ final output
//! ```
//!
//! The SAT builds by recursive doubling: each sub-pass sums sixteen taps at
//! the current stride, and two iterations per direction cover the full
//! 256-texel axis. Every texel of the final table holds the inclusive
//! prefix sum of the blurred moments, so the composite pass can average any
//! rectangle with four loads.
//!
//! The shadow map never resizes, so every sub-pass's parameter buffer and
//! bind group is built once up front.

use crate::gpu::Gpu;
use crate::pipeline::shadow::{MOMENTS_FORMAT, SHADOW_MAP_SIZE};
use crate::pipeline::targets::OffscreenTarget;
use wgpu::util::DeviceExt;

/// Taps per SAT sub-pass.
pub const SAT_TAPS: i32 = 16;

/// Iterations per SAT direction; `SAT_TAPS ^ SAT_ITERATIONS` must reach
/// [`SHADOW_MAP_SIZE`].
pub const SAT_ITERATIONS: u32 = 2;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FilterParams {
    direction: [i32; 2],
    stride: i32,
    taps: i32,
}

enum Kernel {
    Blur,
    Sat,
}

struct FilterStep {
    kernel: Kernel,
    bind_group: wgpu::BindGroup,
    /// Renders into ping when true, pong otherwise.
    to_ping: bool,
}

pub struct FilterPass {
    blur_pipeline: wgpu::RenderPipeline,
    sat_pipeline: wgpu::RenderPipeline,
    steps: Vec<FilterStep>,
    ping: OffscreenTarget,
    pong: OffscreenTarget,
}

impl FilterPass {
    pub fn new(gpu: &Gpu, moments: &OffscreenTarget) -> Self {
        debug_assert!(SAT_TAPS.pow(SAT_ITERATIONS) >= SHADOW_MAP_SIZE as i32);

        let device = &gpu.device;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow filter"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow filter"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, source: &str| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: MOMENTS_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let blur_pipeline = make_pipeline("shadow blur", include_str!("../shaders/blur.wgsl"));
        let sat_pipeline = make_pipeline("shadow sat", include_str!("../shaders/sat.wgsl"));

        let ping = OffscreenTarget::new(
            gpu,
            "shadow filter ping",
            SHADOW_MAP_SIZE,
            SHADOW_MAP_SIZE,
            MOMENTS_FORMAT,
        );
        let pong = OffscreenTarget::new(
            gpu,
            "shadow filter pong",
            SHADOW_MAP_SIZE,
            SHADOW_MAP_SIZE,
            MOMENTS_FORMAT,
        );

        let make_step = |kernel: Kernel,
                         source: &wgpu::TextureView,
                         to_ping: bool,
                         direction: [i32; 2],
                         stride: i32| {
            let params = FilterParams {
                direction,
                stride,
                taps: SAT_TAPS,
            };
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shadow filter params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("shadow filter step"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                ],
            });
            FilterStep {
                kernel,
                bind_group,
                to_ping,
            }
        };

        let steps = vec![
            make_step(Kernel::Blur, &moments.view, true, [1, 0], 1),
            make_step(Kernel::Blur, &ping.view, false, [0, 1], 1),
            make_step(Kernel::Sat, &pong.view, true, [1, 0], 1),
            make_step(Kernel::Sat, &ping.view, false, [1, 0], SAT_TAPS),
            make_step(Kernel::Sat, &pong.view, true, [0, 1], 1),
            make_step(Kernel::Sat, &ping.view, false, [0, 1], SAT_TAPS),
        ];

        Self {
            blur_pipeline,
            sat_pipeline,
            steps,
            ping,
            pong,
        }
    }

    /// The finished summed-area table over the blurred moments.
    pub fn output(&self) -> &wgpu::TextureView {
        &self.pong.view
    }

    /// Encode every blur and SAT sub-pass in order.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
        for step in &self.steps {
            let target = if step.to_ping {
                &self.ping.view
            } else {
                &self.pong.view
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow filter step"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(match step.kernel {
                Kernel::Blur => &self.blur_pipeline,
                Kernel::Sat => &self.sat_pipeline,
            });
            pass.set_bind_group(0, &step.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}
