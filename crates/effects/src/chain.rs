use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::EffectError;

/// One post-processing step applied by the compositor.
///
/// Effects are written to config files as tables tagged by `kind`:
///
/// ```toml
/// [[effects]]
/// kind = "brightness"
/// amount = { op = "mul", lhs = -0.9, rhs = { channel = 1, component = "b" } }
///
/// [[effects]]
/// kind = "godrays"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Effect {
    /// Adds `amount` to every colour channel.
    Brightness { amount: Expr },
    /// Scales colours around mid-grey by `1 + amount`.
    Contrast { amount: Expr },
    /// Screen-space light shafts radiating from `light_position`.
    Godrays(GodraysParams),
}

impl Effect {
    pub fn brightness(amount: Expr) -> Self {
        Effect::Brightness { amount }
    }

    pub fn contrast(amount: Expr) -> Self {
        Effect::Contrast { amount }
    }

    pub fn godrays() -> Self {
        Effect::Godrays(GodraysParams::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Effect::Brightness { .. } => "brightness",
            Effect::Contrast { .. } => "contrast",
            Effect::Godrays(_) => "godrays",
        }
    }

    pub fn validate(&self, channel_count: usize) -> Result<(), EffectError> {
        match self {
            Effect::Brightness { amount } | Effect::Contrast { amount } => {
                amount.validate(channel_count)
            }
            Effect::Godrays(params) => params.validate(),
        }
    }
}

/// Tuning knobs for [`Effect::Godrays`].
///
/// Positions are in texture space with the origin in the bottom-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GodraysParams {
    pub light_position: [f32; 2],
    pub samples: u32,
    pub density: f32,
    pub weight: f32,
    pub decay: f32,
    pub exposure: f32,
    /// Luminance below this value does not emit light.
    pub threshold: f32,
}

impl Default for GodraysParams {
    fn default() -> Self {
        Self {
            light_position: [0.5, 0.5],
            samples: 100,
            density: 1.0,
            weight: 0.01,
            decay: 1.0,
            exposure: 1.0,
            threshold: 0.0,
        }
    }
}

/// Upper bound on ray-march steps; keeps a typo from hanging the GPU.
pub(crate) const MAX_GODRAYS_SAMPLES: u32 = 512;

impl GodraysParams {
    fn validate(&self) -> Result<(), EffectError> {
        if self.samples == 0 || self.samples > MAX_GODRAYS_SAMPLES {
            return Err(EffectError::InvalidParameter {
                effect: "godrays",
                name: "samples",
                reason: format!("must be between 1 and {MAX_GODRAYS_SAMPLES}"),
            });
        }
        let scalars = [
            ("light_position", self.light_position[0]),
            ("light_position", self.light_position[1]),
            ("density", self.density),
            ("weight", self.weight),
            ("decay", self.decay),
            ("exposure", self.exposure),
            ("threshold", self.threshold),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(EffectError::InvalidParameter {
                    effect: "godrays",
                    name,
                    reason: format!("{value} is not a finite number"),
                });
            }
        }
        Ok(())
    }
}

/// Ordered list of effects; the first entry sees the primary image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectChain {
    effects: Vec<Effect>,
}

impl EffectChain {
    pub fn new(effects: Vec<Effect>) -> Self {
        Self { effects }
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Validates every effect against the number of bound channels.
    pub fn validate(&self, channel_count: usize) -> Result<(), EffectError> {
        self.effects
            .iter()
            .try_for_each(|effect| effect.validate(channel_count))
    }

    /// Generates one fragment shader per compositor pass, in pass order.
    ///
    /// An empty chain still yields a single pass-through shader so the primary
    /// image reaches the output.
    pub fn pass_sources(&self, channel_count: usize) -> Result<Vec<String>, EffectError> {
        self.validate(channel_count)?;
        if self.effects.is_empty() {
            return Ok(vec![crate::codegen::fragment_source(None, channel_count)?]);
        }
        self.effects
            .iter()
            .map(|effect| crate::codegen::fragment_source(Some(effect), channel_count))
            .collect()
    }
}

impl FromIterator<Effect> for EffectChain {
    fn from_iter<T: IntoIterator<Item = Effect>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
