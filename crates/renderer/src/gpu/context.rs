use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use winit::window::Window;

use super::targets::TargetSize;

/// Window surface plus the configuration it was last configured with.
pub(crate) struct SurfaceBinding {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

/// Device, queue and (for windowed runs) the presentation surface.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: Option<SurfaceBinding>,
    pub size: TargetSize,
}

impl GpuContext {
    pub(crate) fn windowed(window: Arc<Window>, size: TargetSize) -> Result<Self> {
        let instance = new_instance();
        let surface = instance
            .create_surface(window)
            .context("failed to create rendering surface")?;
        let adapter = request_adapter(&instance, Some(&surface))?;
        let (device, queue) = request_device(&adapter, size)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        if surface_format.is_srgb() {
            tracing::warn!(
                ?surface_format,
                "no linear (non-sRGB) surface format available; colours will be gamma encoded"
            );
        }
        // Fifo is always supported and paces frames to the display refresh.
        let present_mode = wgpu::PresentMode::Fifo;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        tracing::debug!(?surface_format, ?present_mode, "configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            device,
            queue,
            surface: Some(SurfaceBinding { surface, config }),
            size,
        })
    }

    /// Context without a surface, for offscreen export.
    pub(crate) fn headless(size: TargetSize) -> Result<Self> {
        let instance = new_instance();
        let adapter = request_adapter(&instance, None)?;
        let (device, queue) = request_device(&adapter, size)?;
        Ok(Self {
            _instance: instance,
            device,
            queue,
            surface: None,
            size,
        })
    }
}

fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn request_adapter(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface,
        force_fallback_adapter: false,
    }))
    .context("failed to find a suitable GPU adapter")?;
    let info = adapter.get_info();
    tracing::debug!(
        name = %info.name,
        backend = ?info.backend,
        device_type = ?info.device_type,
        "selected GPU adapter"
    );
    Ok(adapter)
}

fn request_device(
    adapter: &wgpu::Adapter,
    size: TargetSize,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let limits = adapter.limits();
    let max_dimension = limits.max_texture_dimension_2d;
    if size.width > max_dimension || size.height > max_dimension {
        anyhow::bail!(
            "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}",
            width = size.width,
            height = size.height
        );
    }
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("shaderstack device"),
        required_features: wgpu::Features::empty(),
        required_limits: limits,
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::default(),
    }))
    .context("failed to create GPU device")
}
