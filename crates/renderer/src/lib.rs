//! Renderer crate for shaderstack.
//!
//! Renders an ordered list of GLSL scenes into offscreen textures every frame
//! and hands them to an effect compositor that writes the final image:
//!
//! ```text
//!   shaderstack CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ GpuState ──▶ FrameDriver::tick(t)
//!                                     │
//!                                     ├─▶ SceneStack: scene 0..n ─▶ target 0..n
//!                                     │
//!                                     └─▶ EffectCompositor: target 0 + channels
//!                                              └─▶ surface / PNG export
//! ```
//!
//! Scene fragments are written against `u_time`, `u_resolution`,
//! `gl_FragCoord` and `gl_FragColor`; `compile` wraps them into GLSL 450 and
//! validates them with naga before any pipeline is built. The effect chain
//! itself lives in the `effects` crate and is GPU-agnostic.

mod compile;
mod gpu;
mod runtime;
mod types;
mod window;

use anyhow::{Context, Result};
use wgpu::naga::ShaderStage;

pub use compile::{ShaderBuildError, UniformLocations};
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, CompositeDraw, FixedTimeSource, FrameDriver,
    RenderPolicy, SceneRender, SystemTimeSource, TimeSample, TimeSource,
};
pub use types::{CompositorInputs, RendererConfig, SceneSource};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Runs until the window closes, or renders one frame to disk for exports.
    pub fn run(self) -> Result<()> {
        if self.config.scenes.is_empty() {
            anyhow::bail!("at least one scene is required");
        }
        match &self.config.policy {
            RenderPolicy::Export { path, .. } => {
                let mut state = gpu::GpuState::headless(&self.config)?;
                let sample = state.export(path)?;
                tracing::debug!(time = sample.seconds, "export finished");
                Ok(())
            }
            RenderPolicy::Animate | RenderPolicy::Still { .. } => window::run_window(self.config),
        }
    }
}

/// Validates every program the config would build without touching a GPU.
///
/// Scenes are wrapped and validated with naga, the effect chain is checked
/// against the number of channels, and each generated pass shader is
/// validated too. Returns the number of programs checked.
pub fn check_shaders(config: &RendererConfig) -> Result<usize> {
    if config.scenes.is_empty() {
        anyhow::bail!("at least one scene is required");
    }
    compile::validate_vertex_shader()?;
    for scene in &config.scenes {
        compile::validate_glsl(
            &scene.label,
            ShaderStage::Fragment,
            &compile::wrap_scene_fragment(&scene.fragment),
        )?;
        tracing::debug!(scene = %scene.label, "scene shader ok");
    }
    let channel_count = config.channel_count();
    let passes = config
        .effects
        .pass_sources(channel_count)
        .context("effect chain does not fit the scene list")?;
    for (index, source) in passes.iter().enumerate() {
        compile::validate_glsl(
            &format!("compositor pass {index}"),
            ShaderStage::Fragment,
            source,
        )?;
    }
    Ok(config.scenes.len() + passes.len() + 1)
}
