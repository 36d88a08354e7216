//! Compiled shader programs and the program cache.
//!
//! A [`CompiledProgram`] is the wgpu analogue of a linked GL program plus
//! its introspection tables: one render pipeline per supported topology, an
//! attribute-name-to-vertex-slot map, and the four-tier uniform layout with
//! every slot's block offset. Programs are built from a [`ProgramDesc`]
//! configuration table (attribute names, uniform declarations, formats),
//! and WGSL compile or validation failures surface as
//! [`RenderError::ShaderCompile`] with the driver's message rather than a
//! device panic.
//!
//! [`ProgramCache`] owns the programs, tracks which one is current so
//! encoders can skip redundant pipeline switches, and owns the uniform
//! arena: one dynamic-offset uniform buffer that every draw slices a
//! 256-byte-aligned slot out of.

use std::collections::BTreeMap;

use crate::error::RenderError;
use crate::gpu::{DEPTH_FORMAT, Gpu};
use crate::mesh::DrawMode;
use crate::uniform::{UniformDef, UniformsLayout};

/// Configuration for one shader program: source, attribute order, uniform
/// declarations, and target state.
pub struct ProgramDesc {
    pub name: &'static str,
    /// WGSL source with `vs` and `fs` entry points.
    pub source: &'static str,
    /// Attribute names in slot order; the position in this list is both the
    /// vertex-buffer slot and the shader `@location`.
    pub attributes: &'static [&'static str],
    /// Uniform declarations in block order.
    pub uniforms: Vec<UniformDef>,
    /// Color target format.
    pub color_format: wgpu::TextureFormat,
    /// Whether the pipeline writes and tests a depth attachment.
    pub depth: bool,
    /// Also build a line-list pipeline for line meshes.
    pub with_lines: bool,
    /// Whether the fragment stage samples the processed shadow texture
    /// (bind group 1).
    pub shadow_input: bool,
}

/// A compiled program: pipelines, attribute slots, uniform layout.
pub struct CompiledProgram {
    name: String,
    triangles: wgpu::RenderPipeline,
    lines: Option<wgpu::RenderPipeline>,
    /// Attribute name → vertex buffer slot (also the shader location).
    pub attributes: BTreeMap<String, u32>,
    /// Four-tier uniform layout with block offsets.
    pub layout: UniformsLayout,
    block_bind_group: wgpu::BindGroup,
    shadow_layout: Option<wgpu::BindGroupLayout>,
}

impl CompiledProgram {
    /// Pipeline for a mesh's draw mode.
    ///
    /// # Panics
    ///
    /// Panics when a line mesh is drawn with a program that declared no
    /// line pipeline — a configuration error.
    pub(crate) fn pipeline_for(&self, mode: DrawMode) -> &wgpu::RenderPipeline {
        match mode {
            DrawMode::Triangles => &self.triangles,
            DrawMode::Lines => self
                .lines
                .as_ref()
                .unwrap_or_else(|| panic!("program '{}' has no line pipeline", self.name)),
        }
    }

    /// Uniform block bind group (group 0), bound with a dynamic offset.
    pub(crate) fn block_bind_group(&self) -> &wgpu::BindGroup {
        &self.block_bind_group
    }

    /// Bind group for the processed shadow texture (group 1), for programs
    /// declared with `shadow_input`.
    pub(crate) fn shadow_bind_group(
        &self,
        gpu: &Gpu,
        shadow_view: &wgpu::TextureView,
    ) -> Option<wgpu::BindGroup> {
        let layout = self.shadow_layout.as_ref()?;
        Some(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} shadow input", self.name)),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(shadow_view),
            }],
        }))
    }
}

/// Slot spacing of the uniform arena. Matches the default
/// `min_uniform_buffer_offset_alignment` and comfortably holds every
/// program's block.
const ARENA_STRIDE: u32 = 1024;

/// One dynamic-offset uniform buffer shared by all draws in a frame.
struct UniformArena {
    buffer: wgpu::Buffer,
    capacity: u32,
}

impl UniformArena {
    fn new(gpu: &Gpu, capacity: u32) -> Self {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform arena"),
            size: capacity as u64 * ARENA_STRIDE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer, capacity }
    }
}

/// Name→program map with current-program tracking and the uniform arena.
pub struct ProgramCache {
    programs: BTreeMap<String, CompiledProgram>,
    current: Option<String>,
    arena: UniformArena,
}

impl ProgramCache {
    pub fn new(gpu: &Gpu) -> Self {
        Self {
            programs: BTreeMap::new(),
            current: None,
            arena: UniformArena::new(gpu, 64),
        }
    }

    /// Compile and register a program.
    pub fn insert(&mut self, gpu: &Gpu, desc: ProgramDesc) -> Result<(), RenderError> {
        let layout = UniformsLayout::build(&desc.uniforms);
        assert!(
            layout.block_size <= ARENA_STRIDE as usize,
            "uniform block of '{}' exceeds the arena stride",
            desc.name
        );

        let device = &gpu.device;

        // Compile inside a validation error scope so WGSL errors come back
        // as data instead of a device loss.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.name),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let block_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} uniform block", desc.name)),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let shadow_layout = desc.shadow_input.then(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} shadow input", desc.name)),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                }],
            })
        });

        let mut group_layouts: Vec<&wgpu::BindGroupLayout> = vec![&block_layout];
        if let Some(shadow) = &shadow_layout {
            group_layouts.push(shadow);
        }
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.name),
            bind_group_layouts: &group_layouts,
            push_constant_ranges: &[],
        });

        // One single-attribute buffer per declared attribute: slot index and
        // shader location are both the position in the declaration list.
        let vertex_attrs: Vec<[wgpu::VertexAttribute; 1]> = desc
            .attributes
            .iter()
            .enumerate()
            .map(|(i, name)| {
                [wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: i as u32,
                    format: attribute_format(name),
                }]
            })
            .collect();
        let vertex_layouts: Vec<wgpu::VertexBufferLayout> = desc
            .attributes
            .iter()
            .zip(&vertex_attrs)
            .map(|(name, attrs)| wgpu::VertexBufferLayout {
                array_stride: attribute_stride(name),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let build_pipeline = |topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.name),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs"),
                    buffers: &vertex_layouts,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.color_format,
                        // No blending anywhere in the pipeline; the moments
                        // format is not blendable in any case.
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    cull_mode: match topology {
                        wgpu::PrimitiveTopology::TriangleList => Some(wgpu::Face::Back),
                        _ => None,
                    },
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: desc.depth.then(|| wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let triangles = build_pipeline(wgpu::PrimitiveTopology::TriangleList);
        let lines = desc
            .with_lines
            .then(|| build_pipeline(wgpu::PrimitiveTopology::LineList));

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompile {
                name: desc.name.to_string(),
                message: error.to_string(),
            });
        }

        let block_bind_group =
            Self::make_block_bind_group(gpu, desc.name, &block_layout, &self.arena, &layout);

        let attributes = desc
            .attributes
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i as u32))
            .collect();

        self.programs.insert(
            desc.name.to_string(),
            CompiledProgram {
                name: desc.name.to_string(),
                triangles,
                lines,
                attributes,
                layout,
                block_bind_group,
                shadow_layout,
            },
        );
        Ok(())
    }

    fn make_block_bind_group(
        gpu: &Gpu,
        name: &str,
        layout: &wgpu::BindGroupLayout,
        arena: &UniformArena,
        uniforms: &UniformsLayout,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{name} uniform block")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &arena.buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(uniforms.block_size as u64),
                }),
            }],
        })
    }

    /// Look up a program.
    pub fn program(&self, name: &str) -> Result<&CompiledProgram, RenderError> {
        self.programs
            .get(name)
            .ok_or_else(|| RenderError::UnknownProgram(name.to_string()))
    }

    /// Mark `name` as the active program, returning whether the encoder
    /// actually has to switch pipelines. Mirrors GL-side `useProgram`
    /// bookkeeping: consecutive draws with the same program skip the
    /// rebind.
    pub fn use_program(&mut self, name: &str) -> Result<bool, RenderError> {
        if !self.programs.contains_key(name) {
            return Err(RenderError::UnknownProgram(name.to_string()));
        }
        let switched = self.current.as_deref() != Some(name);
        if switched {
            self.current = Some(name.to_string());
        }
        Ok(switched)
    }

    /// Forget the current program. Called at the start of every render pass
    /// since a fresh pass has no pipeline bound.
    pub fn begin_pass(&mut self) {
        self.current = None;
    }

    /// Name of the current program, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Grow the uniform arena to hold at least `slots` draws this frame.
    /// Reallocation rebuilds every program's block bind group.
    pub fn ensure_slots(&mut self, gpu: &Gpu, slots: u32) {
        if slots <= self.arena.capacity {
            return;
        }
        let capacity = slots.next_power_of_two();
        log::debug!("growing uniform arena to {capacity} slots");
        self.arena = UniformArena::new(gpu, capacity);

        let block_layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("uniform block"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        for program in self.programs.values_mut() {
            program.block_bind_group = Self::make_block_bind_group(
                gpu,
                &program.name,
                &block_layout,
                &self.arena,
                &program.layout,
            );
        }
    }

    /// Byte offset of an arena slot, for `set_bind_group` dynamic offsets.
    pub fn slot_offset(&self, slot: u32) -> u32 {
        assert!(slot < self.arena.capacity, "uniform arena slot overflow");
        slot * ARENA_STRIDE
    }

    /// Upload a resolved uniform block into an arena slot.
    pub fn write_slot(&self, gpu: &Gpu, slot: u32, block: &[u8]) {
        gpu.queue
            .write_buffer(&self.arena.buffer, self.slot_offset(slot) as u64, block);
    }
}

fn attribute_format(name: &str) -> wgpu::VertexFormat {
    match name {
        "position" | "normal" => wgpu::VertexFormat::Float32x3,
        "color" => wgpu::VertexFormat::Float32x4,
        other => panic!("unknown vertex attribute '{other}'"),
    }
}

fn attribute_stride(name: &str) -> u64 {
    match name {
        "position" | "normal" => 12,
        "color" => 16,
        other => panic!("unknown vertex attribute '{other}'"),
    }
}
