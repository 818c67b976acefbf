//! Data directory resolution
//!
//! Priority order:
//! 1. `--data-dir` command-line argument
//! 2. `KEYBOARD_SOUND_HOME` environment variable
//! 3. OS data directory (`<data_dir>/KeyboardSound`)
//! 4. Directory of the running executable

use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "KEYBOARD_SOUND_HOME";
const APP_DIR_NAME: &str = "KeyboardSound";

/// Locations of everything the application persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the data directory from the CLI argument, environment or OS default.
    pub fn resolve(cli_arg: Option<&str>) -> Self {
        let env_value = std::env::var(DATA_DIR_ENV).ok();
        Self::resolve_from(cli_arg, env_value.as_deref())
    }

    fn resolve_from(cli_arg: Option<&str>, env_value: Option<&str>) -> Self {
        if let Some(path) = cli_arg {
            return Self::new(path);
        }

        if let Some(path) = env_value.filter(|p| !p.trim().is_empty()) {
            return Self::new(path);
        }

        if let Some(dir) = dirs::data_dir() {
            return Self::new(dir.join(APP_DIR_NAME));
        }

        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(exe_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn sounds_dir(&self) -> PathBuf {
        self.root.join("AudioFiles")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let paths = AppPaths::resolve(Some("/tmp/ks-data"));
        assert_eq!(paths.root(), Path::new("/tmp/ks-data"));
        assert_eq!(paths.config_file(), Path::new("/tmp/ks-data/config.toml"));
        assert_eq!(paths.sounds_dir(), Path::new("/tmp/ks-data/AudioFiles"));

        let paths = AppPaths::resolve_from(Some("/tmp/ks-data"), Some("/tmp/ks-env"));
        assert_eq!(paths.root(), Path::new("/tmp/ks-data"));
    }

    #[test]
    fn environment_beats_os_default() {
        let paths = AppPaths::resolve_from(None, Some("/tmp/ks-env"));
        assert_eq!(paths.root(), Path::new("/tmp/ks-env"));
        assert_eq!(paths.log_dir(), Path::new("/tmp/ks-env"));
    }

    #[test]
    fn blank_environment_falls_through_to_os_default() {
        let expected = AppPaths::resolve_from(None, None);
        assert_eq!(AppPaths::resolve_from(None, Some("   ")), expected);
        assert_eq!(AppPaths::resolve_from(None, Some("")), expected);

        if let Some(dir) = dirs::data_dir() {
            assert_eq!(expected.root(), dir.join("KeyboardSound"));
        }
    }
}
