use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as AnyhowContext, Result};
use tracing::debug;
use winit::window::Window;

use crate::runtime::{FrameDriver, RenderPolicy, TimeSample};
use crate::types::RendererConfig;

use super::compositor::{EffectCompositor, Presenter};
use super::context::GpuContext;
use super::export::save_target_png;
use super::quad::FullscreenQuad;
use super::scenes::SceneStack;
use super::targets::TargetSize;

/// Everything needed to produce a frame: scenes, compositor and the clock.
pub(crate) struct GpuState {
    context: GpuContext,
    scenes: SceneStack,
    compositor: EffectCompositor,
    driver: FrameDriver,
    frames_since_last_update: u32,
    last_fps_update: Instant,
}

impl GpuState {
    pub(crate) fn windowed(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let inner = window.inner_size();
        let size = TargetSize::new(inner.width, inner.height);
        let mut context = GpuContext::windowed(window, size)?;
        let binding = context
            .surface
            .take()
            .context("windowed context has no surface")?;
        Self::assemble(context, Presenter::Surface(binding), config)
    }

    pub(crate) fn headless(config: &RendererConfig) -> Result<Self> {
        let (width, height) = config.surface_size;
        let size = TargetSize::new(width, height);
        let context = GpuContext::headless(size)?;
        let presenter = Presenter::offscreen(&context.device, size);
        Self::assemble(context, presenter, config)
    }

    fn assemble(context: GpuContext, presenter: Presenter, config: &RendererConfig) -> Result<Self> {
        let size = context.size;
        let quad = FullscreenQuad::new(&context.device);
        let scenes = SceneStack::new(
            &context.device,
            &context.queue,
            quad.clone(),
            &config.scenes,
            size,
        )?;
        let compositor = EffectCompositor::new(
            &context.device,
            &context.queue,
            quad,
            &config.effects,
            scenes.compositor_inputs()?,
            presenter,
            size,
        )?;
        Ok(Self {
            context,
            scenes,
            compositor,
            driver: FrameDriver::for_policy(&config.policy),
            frames_since_last_update: 0,
            last_fps_update: Instant::now(),
        })
    }

    /// Renders one frame: every scene, then the effect chain.
    pub(crate) fn render(&mut self) -> Result<TimeSample> {
        let sample = self.driver.tick(&mut self.scenes, &mut self.compositor)?;

        self.frames_since_last_update += 1;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_fps_update);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_last_update as f32 / elapsed.as_secs_f32();
            debug!(
                fps = fps.round(),
                frame = sample.frame_index,
                time = sample.seconds,
                "render stats"
            );
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
        }
        Ok(sample)
    }

    /// Reallocates scene targets at the new size and rebinds the compositor.
    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let size = TargetSize::new(width, height);
        if size == self.scenes.size() {
            return Ok(());
        }
        debug!(width, height, "resizing render targets");
        self.context.size = size;
        self.scenes.resize(size);
        self.compositor.resize(size, self.scenes.compositor_inputs()?)
    }

    /// Restores the surface after `Lost`/`Outdated`.
    pub(crate) fn reconfigure_surface(&self) {
        self.compositor.presenter().reconfigure(&self.context.device);
    }

    /// Renders one frame offscreen and writes it to `path`.
    pub(crate) fn export(&mut self, path: &Path) -> Result<TimeSample> {
        let sample = self.render()?;
        match self.compositor.presenter() {
            Presenter::Texture(target) => {
                save_target_png(&self.context.device, &self.context.queue, target, path)?;
                Ok(sample)
            }
            Presenter::Surface(_) => anyhow::bail!("export requires an offscreen renderer"),
        }
    }

    pub(crate) fn wants_continuous_redraw(policy: &RenderPolicy) -> bool {
        matches!(policy, RenderPolicy::Animate)
    }
}
