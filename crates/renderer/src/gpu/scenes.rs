use anyhow::{Context, Result};

use crate::runtime::SceneRender;
use crate::types::{CompositorInputs, SceneSource};

use super::pipeline::{SceneLayouts, ShaderProgram};
use super::quad::FullscreenQuad;
use super::targets::{RenderTarget, TargetSize};
use super::uniforms::{create_uniform_binding, FrameUniforms};

/// One scene program bound to the offscreen target it renders into.
struct SceneSlot {
    program: ShaderProgram,
    target: RenderTarget,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Ordered scene slots. Slot 0 is the primary image.
pub(crate) struct SceneStack {
    device: wgpu::Device,
    queue: wgpu::Queue,
    quad: FullscreenQuad,
    slots: Vec<SceneSlot>,
    size: TargetSize,
}

impl SceneStack {
    /// Builds one program and one target per scene, in order.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        quad: FullscreenQuad,
        scenes: &[SceneSource],
        size: TargetSize,
    ) -> Result<Self> {
        if scenes.is_empty() {
            anyhow::bail!("at least one scene is required");
        }
        let layouts = SceneLayouts::new(device)?;
        let initial = FrameUniforms::new(size.width, size.height);
        let mut slots = Vec::with_capacity(scenes.len());
        for (index, scene) in scenes.iter().enumerate() {
            let program = ShaderProgram::build(device, &layouts, &scene.label, &scene.fragment)?;
            let target = RenderTarget::allocate(device, &target_label(index, &scene.label), size);
            let (uniform_buffer, bind_group) = create_uniform_binding(
                device,
                queue,
                &layouts.uniform_layout,
                &scene.label,
                &initial,
            );
            tracing::debug!(slot = index, scene = %scene.label, "scene program ready");
            slots.push(SceneSlot {
                program,
                target,
                uniform_buffer,
                bind_group,
            });
        }
        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            quad,
            slots,
            size,
        })
    }

    /// Slot targets mapped onto compositor inputs (slot 0 primary, rest channels).
    pub fn compositor_inputs(&self) -> Result<CompositorInputs<'_, RenderTarget>> {
        CompositorInputs::from_ordered(self.slots.iter().map(|slot| &slot.target))
            .context("scene stack has no slots to composite")
    }

    pub fn size(&self) -> TargetSize {
        self.size
    }

    /// Reallocates every target at the new size and refreshes `u_resolution`.
    ///
    /// Old views stay alive for anyone still holding a clone, so callers must
    /// rebind the compositor afterwards.
    pub fn resize(&mut self, size: TargetSize) {
        if size == self.size {
            return;
        }
        self.size = size;
        let resolution = FrameUniforms::new(size.width, size.height).resolution;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.target =
                RenderTarget::allocate(&self.device, &target_label(index, &slot.program.label), size);
            if let Some(offset) = slot.program.locations.resolution {
                self.queue
                    .write_buffer(&slot.uniform_buffer, offset, bytemuck::cast_slice(&resolution));
            }
        }
    }
}

impl SceneRender for SceneStack {
    fn render_scenes(&mut self, seconds: f32) -> Result<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene encoder"),
            });
        for slot in &self.slots {
            if let Some(offset) = slot.program.locations.time {
                self.queue
                    .write_buffer(&slot.uniform_buffer, offset, bytemuck::bytes_of(&seconds));
            }
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&slot.program.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &slot.target.view,
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
            pass.set_pipeline(&slot.program.pipeline);
            pass.set_bind_group(0, &slot.bind_group, &[]);
            self.quad.draw(&mut pass);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

fn target_label(index: usize, scene: &str) -> String {
    format!("scene target {index} ({scene})")
}
