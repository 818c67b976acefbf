//! Error types shared across the engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to install the OS-level keyboard intercept.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("keyboard hook permission denied: {0}")]
    PermissionDenied(String),
    #[error("keyboard hook rejected by platform: {0}")]
    PlatformRejected(String),
}

/// Failure of a single playback instance, or of scheduling one.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("sound file missing: {0}")]
    FileMissing(PathBuf),
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },
    #[error("audio output device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to spawn playback task: {0}")]
    SpawnFailed(#[source] io::Error),
    #[error("playback task panicked: {0}")]
    Panicked(String),
}

/// Failure to read or write the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config file {path} is corrupt: {source}")]
    CorruptFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A sound selection was refused; the previous active file is kept.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidFileSelection {
    #[error("no sound file name given")]
    Empty,
    #[error("invalid sound file name: {0}")]
    InvalidName(String),
    #[error("sound file not found: {0}")]
    NotFound(String),
    #[error("unsupported audio file extension: {0}")]
    UnsupportedExtension(String),
}

/// Failure while managing the stored sound files.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("source file does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("unsupported audio file extension: {0}")]
    UnsupportedExtension(String),
    #[error("invalid sound file name: {0}")]
    InvalidName(String),
    #[error("sound storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure to take the single-instance lock.
#[derive(Debug, Error)]
pub enum InstanceLockError {
    #[error("failed to create lock at {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
