use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories_next::BaseDirs;
use effects::{EffectChain, EffectError};
use serde::{Deserialize, Serialize};

use crate::scenes::{default_effects, default_scenes};

pub const ENV_CONFIG: &str = "SHADERSTACK_CONFIG";
const CONFIG_DIR_NAME: &str = "shaderstack";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid effect chain: {0}")]
    Effects(#[from] EffectError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub size: [u32; 2],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "shaderstack".into(),
            size: [1280, 720],
        }
    }
}

/// One scene slot: inline GLSL or a path to a fragment file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl SceneConfig {
    pub fn inline(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
            path: None,
        }
    }

    /// Returns the GLSL for this scene, reading `path` relative to `base_dir`.
    pub fn load_source(&self, base_dir: Option<&Path>) -> Result<String, ConfigError> {
        match (&self.source, &self.path) {
            (Some(source), None) => Ok(source.clone()),
            (None, Some(path)) => {
                let path = match base_dir {
                    Some(base) if path.is_relative() => base.join(path),
                    _ => path.clone(),
                };
                fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })
            }
            _ => Err(ConfigError::Invalid(format!(
                "scene '{}' must set exactly one of `source` or `path`",
                self.name
            ))),
        }
    }
}

/// File shape: every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    window: WindowConfig,
    scenes: Option<Vec<SceneConfig>>,
    effects: Option<EffectChain>,
}

/// Effective configuration after defaults are applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub scenes: Vec<SceneConfig>,
    pub effects: EffectChain,
    /// Directory scene paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            scenes: default_scenes(),
            effects: default_effects(),
            base_dir: None,
        }
    }
}

impl DemoConfig {
    /// Parses and validates a config document.
    ///
    /// Omitting `scenes` selects the built-in scenes. Omitting `effects`
    /// selects the built-in chain for the built-in scenes and an empty chain
    /// for custom scenes, since the built-in chain reads channel 1.
    pub fn from_toml_str(input: &str, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(input)?;
        let (scenes, effects) = match (raw.scenes, raw.effects) {
            (None, effects) => (default_scenes(), effects.unwrap_or_else(default_effects)),
            (Some(scenes), effects) => (scenes, effects.unwrap_or_default()),
        };
        let config = Self {
            window: raw.window,
            scenes,
            effects,
            base_dir: base_dir.map(Path::to_path_buf),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path.parent())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let [width, height] = self.window.size;
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {width}x{height}"
            )));
        }
        if self.scenes.is_empty() {
            return Err(ConfigError::Invalid(
                "config must define at least one scene".into(),
            ));
        }
        for scene in &self.scenes {
            if scene.name.trim().is_empty() {
                return Err(ConfigError::Invalid("scene names must not be empty".into()));
            }
            if scene.source.is_some() == scene.path.is_some() {
                return Err(ConfigError::Invalid(format!(
                    "scene '{}' must set exactly one of `source` or `path`",
                    scene.name
                )));
            }
        }
        self.effects.validate(self.channel_count())?;
        Ok(())
    }

    /// Scenes after the first are the compositor's channels.
    pub fn channel_count(&self) -> usize {
        self.scenes.len().saturating_sub(1)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Picks the config file to load, if any.
///
/// An explicit path (flag or `SHADERSTACK_CONFIG`) always wins; otherwise
/// `<config dir>/shaderstack/config.toml` is used when it exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env::var_os(ENV_CONFIG).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let candidate = BaseDirs::new()?
        .config_dir()
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use effects::Effect;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn empty_document_yields_builtin_demo() {
        let config = DemoConfig::from_toml_str("", None).unwrap();
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.scenes.len(), 3);
        assert_eq!(config.effects.len(), 2);
    }

    #[test]
    fn custom_scenes_default_to_no_effects() {
        let config = DemoConfig::from_toml_str(
            r#"
[window]
title = "custom"
size = [800, 600]

[[scenes]]
name = "solid"
source = "void main() { gl_FragColor = vec4(1.0); }"
"#,
            None,
        )
        .unwrap();
        assert_eq!(config.window.title, "custom");
        assert_eq!(config.window.size, [800, 600]);
        assert_eq!(config.scenes.len(), 1);
        assert!(config.effects.is_empty());
    }

    #[test]
    fn effects_parse_from_tables() {
        let config = DemoConfig::from_toml_str(
            r#"
[[scenes]]
name = "a"
source = "void main() {}"

[[scenes]]
name = "b"
source = "void main() {}"

[[effects]]
kind = "contrast"
amount = { channel = 0, component = "r" }

[[effects]]
kind = "godrays"
samples = 40
"#,
            None,
        )
        .unwrap();
        assert_eq!(config.effects.len(), 2);
        assert_eq!(config.effects.effects()[1].name(), "godrays");
    }

    #[test]
    fn rejects_missing_channels() {
        let err = DemoConfig::from_toml_str(
            r#"
[[scenes]]
name = "only"
source = "void main() {}"

[[effects]]
kind = "brightness"
amount = { channel = 1, component = "b" }
"#,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Effects(EffectError::ChannelOutOfRange { .. })));
    }

    #[test]
    fn rejects_scene_with_both_or_neither_source() {
        for scene in [
            "name = \"x\"\nsource = \"a\"\npath = \"b.frag\"",
            "name = \"x\"",
        ] {
            let input = format!("[[scenes]]\n{scene}\n");
            let err = DemoConfig::from_toml_str(&input, None).unwrap_err();
            assert!(err.to_string().contains("exactly one of"), "{err}");
        }
    }

    #[test]
    fn rejects_zero_size_and_empty_scene_list() {
        let err = DemoConfig::from_toml_str("[window]\nsize = [0, 10]\n", None).unwrap_err();
        assert!(err.to_string().contains("non-zero"));
        let err = DemoConfig::from_toml_str("scenes = []\n", None).unwrap_err();
        assert!(err.to_string().contains("at least one scene"));
    }

    #[test]
    fn unknown_sections_are_errors() {
        let err = DemoConfig::from_toml_str("[renderer]\nfoo = 1\n", None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn scene_paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("wave.frag"), "void main() {}\n").unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[[scenes]]\nname = \"wave\"\npath = \"wave.frag\"\n",
        )
        .unwrap();

        let config = DemoConfig::load(&config_path).unwrap();
        let source = config.scenes[0]
            .load_source(config.base_dir.as_deref())
            .unwrap();
        assert_eq!(source, "void main() {}\n");
    }

    #[test]
    fn missing_scene_file_reports_path() {
        let scene = SceneConfig {
            name: "gone".into(),
            source: None,
            path: Some(PathBuf::from("missing.frag")),
        };
        let dir = TempDir::new().unwrap();
        let err = scene.load_source(Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("missing.frag"));
    }

    #[test]
    fn printed_config_parses_back() {
        let mut config = DemoConfig::default();
        config.effects = [Effect::godrays()].into_iter().collect();
        let printed = config.to_toml_string().unwrap();
        let reparsed = DemoConfig::from_toml_str(&printed, None).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/explicit.toml");
        assert_eq!(resolve_config_path(Some(path)), Some(path.to_path_buf()));
    }
}
