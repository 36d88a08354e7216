//! Offscreen render targets for the multi-pass pipeline.

use crate::gpu::Gpu;

/// A texture that is rendered to by one pass and read back by a later one.
pub struct OffscreenTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl OffscreenTarget {
    /// Create a target usable as both a render attachment and a texture
    /// binding.
    pub fn new(
        gpu: &Gpu,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }

    /// Recreate the target when its size no longer matches (window resize).
    pub fn ensure_size(&mut self, gpu: &Gpu, label: &str, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::new(gpu, label, width, height, self.format);
        }
    }
}
