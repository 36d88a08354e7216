//! GPU context and device management.
//!
//! [`Gpu`] is the renderer context: it owns the wgpu surface, device, queue,
//! and surface configuration, and is passed by reference to every operation
//! that touches the GPU. There is no module-level GL-style state; everything
//! flows through this struct, and dropping it tears the device down.

use std::sync::Arc;
use winit::window::Window;

use crate::error::RenderError;

/// Depth attachment format shared by the shadow and composite passes.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Renderer context holding the core wgpu resources.
///
/// Created once at startup from a winit window. All fields are public so
/// callers can reach the raw wgpu API when the crate's abstractions are not
/// enough.
pub struct Gpu {
    /// The surface presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical device used to create buffers, textures, and pipelines.
    pub device: wgpu::Device,
    /// The command queue for buffer writes and command-buffer submission.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl Gpu {
    /// Initialize the GPU context for a window.
    ///
    /// Blocks on adapter and device acquisition (startup is the only phase
    /// that is allowed to block). Fails with [`RenderError::Init`] when no
    /// suitable adapter exists or device creation is refused, so the caller
    /// can abort startup with a readable message instead of a panic.
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Init(format!("failed to create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::Init(format!("no suitable GPU adapter: {e}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Sundial Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| RenderError::Init(format!("failed to create device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    /// Resize the surface. Zero-sized dimensions (window minimize) are
    /// ignored to avoid surface validation errors.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }
}
