/// Colour format of every offscreen target: 8 bits per channel RGBA.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Physical pixel size of the drawable backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn extent(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// A texture that can be rendered into and then sampled by later passes.
///
/// The view plays the role of a per-slot framebuffer: render passes attach
/// it as their only colour target.
#[derive(Clone)]
pub(crate) struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: TargetSize,
}

impl RenderTarget {
    /// Allocates an uninitialised target; contents are undefined until first drawn.
    pub fn allocate(device: &wgpu::Device, label: &str, size: TargetSize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: size.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        tracing::trace!(label, width = size.width, height = size.height, "allocated render target");
        Self {
            texture,
            view,
            sampler,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_never_collapses_to_zero() {
        let size = TargetSize::new(0, 0);
        assert_eq!(size, TargetSize::new(1, 1));
        let extent = TargetSize::new(1280, 720).extent();
        assert_eq!((extent.width, extent.height), (1280, 720));
        assert_eq!(extent.depth_or_array_layers, 1);
    }
}
