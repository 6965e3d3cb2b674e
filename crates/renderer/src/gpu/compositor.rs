use anyhow::{Context as AnyhowContext, Result};
use effects::{
    plan_passes, ping_pong_buffers, EffectChain, PassInput, PassOutput, PassPlan,
    PASS_BINDINGS_PER_CHANNEL, PASS_CHANNEL_BINDING_BASE,
};

use crate::compile::compile_vertex_shader;
use crate::runtime::CompositeDraw;
use crate::types::CompositorInputs;

use super::context::SurfaceBinding;
use super::pipeline::{compile_pass_fragment, link_fullscreen_pipeline};
use super::quad::FullscreenQuad;
use super::targets::{RenderTarget, TargetSize, TARGET_FORMAT};
use super::uniforms::{create_uniform_binding, uniform_layout, FrameUniforms};

/// Where the last compositor pass writes.
pub(crate) enum Presenter {
    /// The window swapchain; each draw acquires and presents one frame.
    Surface(SurfaceBinding),
    /// An offscreen texture that can be read back after the draw.
    Texture(RenderTarget),
}

impl Presenter {
    pub fn offscreen(device: &wgpu::Device, size: TargetSize) -> Self {
        Self::Texture(RenderTarget::allocate(device, "compositor output", size))
    }

    fn format(&self) -> wgpu::TextureFormat {
        match self {
            Self::Surface(binding) => binding.config.format,
            Self::Texture(_) => TARGET_FORMAT,
        }
    }

    fn resize(&mut self, device: &wgpu::Device, size: TargetSize) {
        match self {
            Self::Surface(binding) => {
                binding.config.width = size.width;
                binding.config.height = size.height;
                binding.surface.configure(device, &binding.config);
            }
            Self::Texture(target) => {
                *target = RenderTarget::allocate(device, "compositor output", size);
            }
        }
    }

    /// Reapplies the current surface configuration after it was lost or outdated.
    pub fn reconfigure(&self, device: &wgpu::Device) {
        if let Self::Surface(binding) = self {
            binding.surface.configure(device, &binding.config);
        }
    }
}

struct CompositorPass {
    pipeline: wgpu::RenderPipeline,
    plan: PassPlan,
}

/// Runs the effect chain over the primary scene texture.
///
/// Pass 0 samples the primary texture, later passes sample the previous
/// pass's ping-pong buffer, and the last pass writes to the presenter.
/// Every pass may also sample each channel texture.
pub(crate) struct EffectCompositor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    quad: FullscreenQuad,
    passes: Vec<CompositorPass>,
    ping_pong: Vec<RenderTarget>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    texture_bind_groups: Vec<wgpu::BindGroup>,
    primary: RenderTarget,
    channels: Vec<RenderTarget>,
    presenter: Presenter,
    size: TargetSize,
}

impl EffectCompositor {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        quad: FullscreenQuad,
        chain: &EffectChain,
        inputs: CompositorInputs<'_, RenderTarget>,
        presenter: Presenter,
        size: TargetSize,
    ) -> Result<Self> {
        let channel_count = inputs.channel_count();
        chain
            .validate(channel_count)
            .context("effect chain does not fit the scene list")?;
        let sources = chain.pass_sources(channel_count)?;

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compositor texture layout"),
            entries: &texture_layout_entries(channel_count),
        });
        let uniform_layout = uniform_layout(device, "compositor uniform layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compositor pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let vertex_module = compile_vertex_shader(device)?;

        let plans = plan_passes(chain.len());
        let mut passes = Vec::with_capacity(plans.len());
        for (index, (source, plan)) in sources.into_iter().zip(plans).enumerate() {
            let label = pass_label(chain, index);
            let fragment_module = compile_pass_fragment(device, &label, source)?;
            let format = match plan.output {
                PassOutput::Final => presenter.format(),
                PassOutput::PingPong(_) => TARGET_FORMAT,
            };
            let pipeline = link_fullscreen_pipeline(
                device,
                &label,
                &pipeline_layout,
                &vertex_module,
                &fragment_module,
                format,
            )?;
            passes.push(CompositorPass { pipeline, plan });
        }
        tracing::debug!(
            passes = passes.len(),
            channels = channel_count,
            "compositor passes ready"
        );

        let ping_pong = allocate_ping_pong(device, ping_pong_buffers(chain.len()), size);
        let (uniform_buffer, uniform_bind_group) = create_uniform_binding(
            device,
            queue,
            &uniform_layout,
            "compositor uniforms",
            &FrameUniforms::new(size.width, size.height),
        );

        let mut compositor = Self {
            device: device.clone(),
            queue: queue.clone(),
            quad,
            passes,
            ping_pong,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            texture_bind_groups: Vec::new(),
            primary: inputs.primary.clone(),
            channels: inputs.channels.into_iter().cloned().collect(),
            presenter,
            size,
        };
        compositor.rebuild_bind_groups();
        Ok(compositor)
    }

    /// Points the passes at freshly allocated scene targets.
    pub fn rebind(&mut self, inputs: CompositorInputs<'_, RenderTarget>) -> Result<()> {
        if inputs.channel_count() != self.channels.len() {
            anyhow::bail!(
                "compositor was built for {} channel(s), got {}",
                self.channels.len(),
                inputs.channel_count()
            );
        }
        self.primary = inputs.primary.clone();
        self.channels = inputs.channels.into_iter().cloned().collect();
        self.rebuild_bind_groups();
        Ok(())
    }

    /// Resizes intermediate buffers and the presenter, then rebinds `inputs`.
    pub fn resize(
        &mut self,
        size: TargetSize,
        inputs: CompositorInputs<'_, RenderTarget>,
    ) -> Result<()> {
        self.size = size;
        self.ping_pong = allocate_ping_pong(&self.device, self.ping_pong.len(), size);
        self.presenter.resize(&self.device, size);
        self.rebind(inputs)
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    fn rebuild_bind_groups(&mut self) {
        let bind_groups = self
            .passes
            .iter()
            .enumerate()
            .map(|(index, pass)| {
                let source = match pass.plan.input {
                    PassInput::Primary => &self.primary,
                    PassInput::PingPong(buffer) => &self.ping_pong[buffer],
                };
                let mut entries = vec![
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&source.sampler),
                    },
                ];
                for (channel, target) in self.channels.iter().enumerate() {
                    let (texture_binding, sampler_binding) = channel_bindings(channel);
                    entries.push(wgpu::BindGroupEntry {
                        binding: texture_binding,
                        resource: wgpu::BindingResource::TextureView(&target.view),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: sampler_binding,
                        resource: wgpu::BindingResource::Sampler(&target.sampler),
                    });
                }
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("compositor pass {index} textures")),
                    layout: &self.texture_layout,
                    entries: &entries,
                })
            })
            .collect();
        self.texture_bind_groups = bind_groups;
    }
}

impl CompositeDraw for EffectCompositor {
    fn draw(&mut self, seconds: f32) -> Result<()> {
        let mut uniforms = FrameUniforms::new(self.size.width, self.size.height);
        uniforms.time = seconds;
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        // Surface errors stay typed so the window loop can downcast and recover.
        let frame = match &self.presenter {
            Presenter::Surface(binding) => Some(binding.surface.get_current_texture()?),
            Presenter::Texture(_) => None,
        };
        let output_view = match (&frame, &self.presenter) {
            (Some(frame), _) => frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            (None, Presenter::Texture(target)) => target.view.clone(),
            (None, Presenter::Surface(_)) => anyhow::bail!("surface frame was not acquired"),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("compositor encoder"),
            });
        for (pass, bind_group) in self.passes.iter().zip(&self.texture_bind_groups) {
            let view = match pass.plan.output {
                PassOutput::Final => &output_view,
                PassOutput::PingPong(buffer) => &self.ping_pong[buffer].view,
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("compositor pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&pass.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, bind_group, &[]);
            self.quad.draw(&mut render_pass);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }
}

fn allocate_ping_pong(device: &wgpu::Device, count: usize, size: TargetSize) -> Vec<RenderTarget> {
    (0..count)
        .map(|index| RenderTarget::allocate(device, &format!("compositor ping-pong {index}"), size))
        .collect()
}

fn pass_label(chain: &EffectChain, index: usize) -> String {
    match chain.effects().get(index) {
        Some(effect) => format!("compositor pass {index} ({})", effect.name()),
        None => format!("compositor pass {index} (passthrough)"),
    }
}

/// Texture and sampler bindings of channel `index` in the pass bind group.
fn channel_bindings(index: usize) -> (u32, u32) {
    let texture = PASS_CHANNEL_BINDING_BASE + index as u32 * PASS_BINDINGS_PER_CHANNEL;
    (texture, texture + 1)
}

/// Set 1 layout: pass input at bindings 0/1, then one texture/sampler pair per channel.
fn texture_layout_entries(channel_count: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut bindings = vec![(0, 1)];
    bindings.extend((0..channel_count).map(channel_bindings));
    let mut entries = Vec::with_capacity(bindings.len() * 2);
    for (texture, sampler) in bindings {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}
