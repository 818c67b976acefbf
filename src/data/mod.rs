//! Data module for configuration, paths and sound file storage

mod audio_files;
mod config;
mod paths;

pub use audio_files::{is_allowed, validate_audio_file, AudioFileRepository, ALLOWED_EXTENSIONS};
pub use config::{AppConfig, ConfigStore, GeneralConfig, SoundConfig, TomlConfigStore};
pub use paths::{AppPaths, DATA_DIR_ENV};
