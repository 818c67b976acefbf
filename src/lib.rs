//! Keyboard Sound - plays a sound effect on every key press
//!
//! A low-level OS keyboard hook feeds key-downs to a dispatcher, which
//! starts an independent, fire-and-forget playback of the selected sound
//! for each one. The hook callback never waits on audio work.

pub mod audio;
pub mod business;
pub mod data;
pub mod error;
pub mod platform;
pub mod ui;

pub use audio::{AudioPlaybackEngine, RodioPlayer};
pub use business::{EngineLifecycleController, EngineNotice, EngineSnapshot};
pub use data::{AppConfig, AppPaths, AudioFileRepository, TomlConfigStore};
pub use error::{
    ConfigError, HookError, InstanceLockError, InvalidFileSelection, PlaybackError,
    RepositoryError,
};
