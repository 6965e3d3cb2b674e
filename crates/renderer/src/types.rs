use effects::EffectChain;

use crate::runtime::RenderPolicy;

/// One scene slot: a label for diagnostics plus its GLSL fragment source.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSource {
    pub label: String,
    pub fragment: String,
}

impl SceneSource {
    pub fn new(label: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fragment: fragment.into(),
        }
    }
}

/// Complete description of what the renderer should draw.
///
/// Scene order matters: slot 0 is the primary texture fed to the first
/// compositor pass, slots 1.. become channels 0.. in the same order.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub title: String,
    pub surface_size: (u32, u32),
    pub scenes: Vec<SceneSource>,
    pub effects: EffectChain,
    pub policy: RenderPolicy,
}

impl RendererConfig {
    /// Number of auxiliary channels the effect chain can sample.
    pub fn channel_count(&self) -> usize {
        self.scenes.len().saturating_sub(1)
    }
}

/// Textures handed to the compositor at construction time.
///
/// Generic over the texture handle so the slot mapping can be checked
/// without a device.
#[derive(Debug)]
pub struct CompositorInputs<'a, T> {
    pub primary: &'a T,
    pub channels: Vec<&'a T>,
}

impl<'a, T> CompositorInputs<'a, T> {
    /// Maps ordered scene targets onto compositor slots. `None` when empty.
    pub fn from_ordered<I>(targets: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a T>,
    {
        let mut targets = targets.into_iter();
        let primary = targets.next()?;
        Some(Self {
            primary,
            channels: targets.collect(),
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
