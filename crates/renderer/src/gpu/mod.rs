//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, device and queue, plus the window
//!   surface when there is one.
//! - `targets` allocates the offscreen textures scenes render into.
//! - `pipeline` turns GLSL into render pipelines over the shared quad.
//! - `scenes` renders every scene slot into its own target each frame.
//! - `compositor` runs the effect chain over those targets and writes the
//!   result to the surface or an offscreen texture.
//! - `export` reads an offscreen texture back and saves it as PNG.
//! - `state` glues everything together behind `GpuState`.

mod compositor;
mod context;
mod export;
mod pipeline;
mod quad;
mod scenes;
mod state;
mod targets;
mod uniforms;

pub(crate) use state::GpuState;
pub(crate) use uniforms::{RESOLUTION_OFFSET, TIME_OFFSET};
