//! Application Configuration
//!
//! Handles loading and saving the persisted engine settings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sound: SoundConfig,
}

impl AppConfig {
    /// Settings used when the stored file cannot be trusted: disabled, no sound.
    pub fn safe_fallback() -> Self {
        Self {
            general: GeneralConfig { enabled: false },
            sound: SoundConfig::default(),
        }
    }

    /// Active file name, `None` when unset.
    pub fn active_file(&self) -> Option<&str> {
        let name = self.sound.active_file.trim();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

fn default_true() -> bool {
    true
}

/// General configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Sound selection configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    /// File name inside the sound storage directory; empty when unset.
    #[serde(default)]
    pub active_file: String,
    /// Pick the first stored sound at startup when none is configured.
    #[serde(default)]
    pub auto_select_first: bool,
}

/// Persistence collaborator for [`AppConfig`].
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<AppConfig, ConfigError>;
    fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;
}

/// TOML file backed configuration store
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    /// A missing file is not an error: defaults are returned.
    fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        toml::from_str(&content).map_err(|source| ConfigError::CorruptFile {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;

        let write = || -> io::Result<()> {
            if let Some(dir) = self.path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&self.path, content)
        };

        write().map_err(|source| ConfigError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::new(dir.path().join("config.toml"));

        let config = store.load().unwrap();
        assert!(config.general.enabled);
        assert_eq!(config.active_file(), None);
        assert!(!config.sound.auto_select_first);
    }

    #[test]
    fn save_then_load_keeps_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::new(dir.path().join("nested").join("config.toml"));

        let mut config = AppConfig::default();
        config.general.enabled = false;
        config.sound.active_file = "click.wav".to_string();
        store.save(&config).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.active_file(), Some("click.wav"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sound]\nactive_file = \"beep.wav\"\n").unwrap();

        let config = TomlConfigStore::new(&path).load().unwrap();
        assert!(config.general.enabled);
        assert_eq!(config.active_file(), Some("beep.wav"));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[general\nenabled = maybe").unwrap();

        let err = TomlConfigStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::CorruptFile { .. }));
    }

    #[test]
    fn safe_fallback_is_disabled_without_sound() {
        let config = AppConfig::safe_fallback();
        assert!(!config.general.enabled);
        assert_eq!(config.active_file(), None);
    }
}
