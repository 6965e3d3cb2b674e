//! Built-in demo scenes and the effect chain that ships with them.

use effects::{Component, Effect, EffectChain, Expr};

use crate::config::SceneConfig;

pub const COLOR_CYCLE: &str = r#"void main() {
  vec2 uv = gl_FragCoord.xy / u_resolution;
  vec3 col = 0.5 + 0.5 * cos(u_time + uv.xyx + vec3(0.0, 2.0, 4.0));
  gl_FragColor = vec4(col, 1.0);
}
"#;

pub const RED_RECTANGLES: &str = r#"void main() {
  vec2 uv = gl_FragCoord.xy / u_resolution;
  float c = ceil(mod((uv.x + u_time / 9.0 + 0.5 * ceil(mod(uv.y * 9.0, 1.0) - 0.5)) * 9.0, 1.0) - 0.5);
  gl_FragColor = vec4(c, c, c, 1.0);
}
"#;

pub const BLUE_WAVES: &str = r#"void main() {
  vec2 uv = gl_FragCoord.xy / u_resolution;
  vec3 col = vec3(0.0, 0.0, 0.5 + 0.5 * cos(u_time * -2.0 + uv.x * 40.0));
  gl_FragColor = vec4(col, 1.0);
}
"#;

/// Primary colour cycle, then the two channel scenes in binding order.
pub fn default_scenes() -> Vec<SceneConfig> {
    [
        ("color-cycle", COLOR_CYCLE),
        ("red-rectangles", RED_RECTANGLES),
        ("blue-waves", BLUE_WAVES),
    ]
    .into_iter()
    .map(|(name, source)| SceneConfig::inline(name, source))
    .collect()
}

/// Darkens the primary image where the blue waves are bright, then adds god rays.
pub fn default_effects() -> EffectChain {
    [
        Effect::brightness(Expr::mul(
            Expr::constant(-0.9),
            Expr::channel(1, Component::B),
        )),
        Effect::godrays(),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use renderer::{check_shaders, RenderPolicy, RendererConfig, SceneSource};

    use super::*;

    #[test]
    fn builtin_stack_passes_validation() {
        let config = RendererConfig {
            title: "shaderstack".into(),
            surface_size: (640, 360),
            scenes: [
                ("color-cycle", COLOR_CYCLE),
                ("red-rectangles", RED_RECTANGLES),
                ("blue-waves", BLUE_WAVES),
            ]
            .into_iter()
            .map(|(name, source)| SceneSource::new(name, source))
            .collect(),
            effects: default_effects(),
            policy: RenderPolicy::Animate,
        };
        assert_eq!(check_shaders(&config).unwrap(), 6);
    }

    #[test]
    fn default_chain_reads_the_second_channel() {
        let chain = default_effects();
        assert_eq!(chain.len(), 2);
        assert!(chain.validate(2).is_ok());
        assert!(chain.validate(1).is_err());
        assert_eq!(default_scenes().len(), 3);
    }
}
