use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::runtime::RenderPolicy;
use crate::types::RendererConfig;

/// What the event loop should do after a frame failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameFailure {
    /// The surface must be reconfigured before the next frame.
    Reconfigure,
    /// Transient; try again on the next redraw.
    Retry,
    /// Unrecoverable; stop the loop and report the error.
    Fatal,
}

pub(crate) fn classify_frame_error(err: &anyhow::Error) -> FrameFailure {
    match err.downcast_ref::<wgpu::SurfaceError>() {
        Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => FrameFailure::Reconfigure,
        Some(wgpu::SurfaceError::Timeout) => FrameFailure::Retry,
        Some(wgpu::SurfaceError::OutOfMemory) => FrameFailure::Fatal,
        Some(_) => FrameFailure::Retry,
        None => FrameFailure::Fatal,
    }
}

/// Opens the window and drives frames until it is closed.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(
            config.surface_size.0,
            config.surface_size.1,
        ))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = GpuState::windowed(window.clone(), &config)
        .map_err(|err| anyhow!("failed to initialise renderer: {err:#}"))?;
    let continuous = GpuState::wants_continuous_redraw(&config.policy);
    if let RenderPolicy::Still { time } = config.policy {
        info!(time, "rendering still frame; redraws happen on demand");
    }
    window.request_redraw();

    let mut fatal: Option<anyhow::Error> = None;
    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => elwt.exit(),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => toggle_fullscreen(&window),
            WindowEvent::Resized(size) => {
                if let Err(err) = state.resize(size.width, size.height) {
                    error!("failed to resize render targets: {err:#}");
                    fatal = Some(err);
                    elwt.exit();
                    return;
                }
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = state.render() {
                    match classify_frame_error(&err) {
                        FrameFailure::Reconfigure => {
                            state.reconfigure_surface();
                            window.request_redraw();
                        }
                        FrameFailure::Retry => warn!("frame skipped: {err}"),
                        FrameFailure::Fatal => {
                            error!("render failed: {err:#}");
                            fatal = Some(err);
                            elwt.exit();
                        }
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            if continuous {
                window.request_redraw();
                elwt.set_control_flow(ControlFlow::Poll);
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    if let Some(err) = fatal {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn toggle_fullscreen(window: &Window) {
    if window.fullscreen().is_some() {
        info!("leaving fullscreen");
        window.set_fullscreen(None);
    } else {
        info!("entering borderless fullscreen");
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_and_outdated_surfaces_are_reconfigured() {
        for surface_err in [wgpu::SurfaceError::Lost, wgpu::SurfaceError::Outdated] {
            let err = anyhow::Error::new(surface_err);
            assert_eq!(classify_frame_error(&err), FrameFailure::Reconfigure);
        }
    }

    #[test]
    fn timeouts_retry_and_out_of_memory_is_fatal() {
        let timeout = anyhow::Error::new(wgpu::SurfaceError::Timeout);
        assert_eq!(classify_frame_error(&timeout), FrameFailure::Retry);
        let oom = anyhow::Error::new(wgpu::SurfaceError::OutOfMemory);
        assert_eq!(classify_frame_error(&oom), FrameFailure::Fatal);
    }

    #[test]
    fn other_errors_are_fatal() {
        let err = anyhow!("shader exploded");
        assert_eq!(classify_frame_error(&err), FrameFailure::Fatal);
    }
}
