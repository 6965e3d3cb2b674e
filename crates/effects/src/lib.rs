//! Effect-chain vocabulary for the shaderstack compositor.
//!
//! Nothing in this crate touches the GPU. It describes *what* the compositor
//! should do to the primary image and produces everything the renderer needs
//! to do it:
//!
//! - `expr` holds scalar expressions that may reference a colour component of
//!   one of the auxiliary channels (e.g. `-0.9 * channel(1).b`).
//! - `chain` holds the declarative effect descriptors (`brightness`,
//!   `contrast`, `godrays`) and the ordered `EffectChain`, all serde-friendly
//!   so they can live in a TOML config.
//! - `codegen` turns one effect into a complete GLSL 450 fragment shader that
//!   samples the previous pass and the channel textures.
//! - `plan` decides which texture each pass reads and writes, ping-ponging
//!   between two intermediate buffers so the primary texture is never written.

mod chain;
mod codegen;
mod expr;
mod plan;

pub use chain::{Effect, EffectChain, GodraysParams};
pub use codegen::{fragment_source, PASS_BINDINGS_PER_CHANNEL, PASS_CHANNEL_BINDING_BASE};
pub use expr::{BinaryOp, Builtin, Component, Expr};
pub use plan::{plan_passes, ping_pong_buffers, PassInput, PassOutput, PassPlan};

/// Errors raised while validating an effect chain or generating its shaders.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EffectError {
    #[error("expression references channel {channel} but only {available} channel(s) are bound")]
    ChannelOutOfRange { channel: usize, available: usize },
    #[error("invalid {effect} parameter `{name}`: {reason}")]
    InvalidParameter {
        effect: &'static str,
        name: &'static str,
        reason: String,
    },
}
