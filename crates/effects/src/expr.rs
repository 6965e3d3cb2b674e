use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EffectError;

/// Colour component of a sampled channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    R,
    G,
    B,
    A,
}

impl Component {
    fn swizzle(self) -> &'static str {
        match self {
            Component::R => "r",
            Component::G => "g",
            Component::B => "b",
            Component::A => "a",
        }
    }
}

/// Values supplied by the compositor rather than sampled from a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Builtin {
    /// Seconds passed to the compositor's `draw` call.
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Scalar expression evaluated per pixel inside an effect pass.
///
/// In TOML an expression is either a bare number, the string `"time"`, a
/// channel lookup table (`{ channel = 1, component = "b" }`) or a binary
/// operation (`{ op = "mul", lhs = -0.9, rhs = { ... } }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Constant(f32),
    Builtin(Builtin),
    Channel {
        channel: usize,
        component: Component,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn constant(value: f32) -> Self {
        Expr::Constant(value)
    }

    pub fn time() -> Self {
        Expr::Builtin(Builtin::Time)
    }

    pub fn channel(channel: usize, component: Component) -> Self {
        Expr::Channel { channel, component }
    }

    pub fn op(lhs: Expr, op: BinaryOp, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Self::op(lhs, BinaryOp::Mul, rhs)
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::op(lhs, BinaryOp::Add, rhs)
    }

    /// Highest channel index referenced anywhere in the expression.
    pub fn max_channel(&self) -> Option<usize> {
        match self {
            Expr::Constant(_) | Expr::Builtin(_) => None,
            Expr::Channel { channel, .. } => Some(*channel),
            Expr::Binary { lhs, rhs, .. } => match (lhs.max_channel(), rhs.max_channel()) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
        }
    }

    /// Checks channel references against the number of bound channels.
    pub fn validate(&self, channel_count: usize) -> Result<(), EffectError> {
        match self.max_channel() {
            Some(channel) if channel >= channel_count => Err(EffectError::ChannelOutOfRange {
                channel,
                available: channel_count,
            }),
            _ => Ok(()),
        }
    }

    /// Renders the expression as a GLSL `float` expression.
    ///
    /// Channel lookups call the `channelN_color()` helpers declared by the
    /// pass prelude, so the result is only meaningful inside a generated pass.
    pub fn to_glsl(&self, channel_count: usize) -> Result<String, EffectError> {
        self.validate(channel_count)?;
        self.render()
    }

    fn render(&self) -> Result<String, EffectError> {
        match self {
            Expr::Constant(value) => glsl_float(*value, "amount"),
            Expr::Builtin(Builtin::Time) => Ok("u_time".to_string()),
            Expr::Channel { channel, component } => {
                Ok(format!("channel{channel}_color().{}", component.swizzle()))
            }
            Expr::Binary { op, lhs, rhs } => Ok(format!(
                "({} {} {})",
                lhs.render()?,
                op.symbol(),
                rhs.render()?
            )),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Builtin(Builtin::Time) => f.write_str("time"),
            Expr::Channel { channel, component } => {
                write!(f, "channel({channel}).{}", component.swizzle())
            }
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

/// Formats a finite float as a GLSL literal that always carries a decimal point.
pub(crate) fn glsl_float(value: f32, name: &'static str) -> Result<String, EffectError> {
    if !value.is_finite() {
        return Err(EffectError::InvalidParameter {
            effect: "expression",
            name,
            reason: format!("{value} is not a finite number"),
        });
    }
    let literal = format!("{value:?}");
    if value.is_sign_negative() && value != 0.0 {
        Ok(format!("({literal})"))
    } else {
        Ok(literal)
    }
}
