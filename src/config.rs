use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio_system::effects::EffectKind;
use crate::error::ConfigError;

fn default_decay_duration() -> f64 {
    0.025
}

fn default_decay_wait() -> f64 {
    0.05
}

fn default_effects() -> Vec<EffectKind> {
    vec![EffectKind::Pan, EffectKind::Pitch, EffectKind::Volume]
}

fn default_sample_rate() -> u32 {
    44100
}

/// Engine tuning loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds a parameter transition or stop fade takes. 25 ms lets half a
    /// 20 Hz wave play out, so bass does not click when cut.
    #[serde(default = "default_decay_duration")]
    pub decay_duration: f64,

    /// Extra grace before a transition starts, for platforms that cannot
    /// change parameters on the very next render quantum
    #[serde(default = "default_decay_wait")]
    pub decay_wait: f64,

    /// Effects of every chain, nearest the input first
    #[serde(default = "default_effects")]
    pub effects: Vec<EffectKind>,

    /// Rate used for substituted silent buffers
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decay_duration: default_decay_duration(),
            decay_wait: default_decay_wait(),
            effects: default_effects(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let config: EngineConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
        config.validate()?;

        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Load from `path`, writing out the defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Self::default();
        config.save(path)?;
        tracing::info!("Created default engine config at {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.decay_duration.is_finite() && self.decay_duration > 0.0) {
            return Err(ConfigError::Invalid(
                "decay_duration must be positive".to_string(),
            ));
        }
        if !(self.decay_wait.is_finite() && self.decay_wait >= 0.0) {
            return Err(ConfigError::Invalid(
                "decay_wait must not be negative".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be non-zero".to_string()));
        }
        for (i, kind) in self.effects.iter().enumerate() {
            if self.effects[..i].contains(kind) {
                return Err(ConfigError::Invalid(format!(
                    "effect {} listed more than once",
                    kind
                )));
            }
        }
        Ok(())
    }

    /// Default config location, `<config dir>/sprite-audio/engine.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sprite-audio").join("engine.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("sprite-audio-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.decay_duration, 0.025);
        assert_eq!(config.decay_wait, 0.05);
        assert_eq!(
            config.effects,
            vec![EffectKind::Pan, EffectKind::Pitch, EffectKind::Volume]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"pan\""));

        let deserialized: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "effects": ["echo"] }"#).unwrap();
        assert_eq!(config.effects, vec![EffectKind::Echo]);
        assert_eq!(config.decay_duration, 0.025);
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.decay_duration = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.effects.push(EffectKind::Pan);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip/engine.json");
        let mut config = EngineConfig::default();
        config.decay_wait = 0.1;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.decay_wait, 0.1);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_or_default_creates_file() {
        let path = temp_path("fresh/engine.json");
        let _ = fs::remove_file(&path);

        let config = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(path.exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_malformed_fails() {
        let path = temp_path("broken/engine.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::load(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
        let _ = fs::remove_file(&path);
    }
}
