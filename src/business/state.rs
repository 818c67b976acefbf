//! Engine state shared between the controller and the hook thread
//!
//! Written rarely (settings changes), read on every key-down. Readers only
//! need the latest committed value, never a consistent pair.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// The sound currently configured for playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFile {
    /// Name inside the sound storage directory.
    pub name: String,
    /// Validated absolute path.
    pub path: PathBuf,
}

impl ActiveFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Default)]
pub struct EngineState {
    enabled: AtomicBool,
    active_file: RwLock<Option<Arc<ActiveFile>>>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn active_file(&self) -> Option<Arc<ActiveFile>> {
        match self.active_file.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_active_file(&self, file: Option<ActiveFile>) {
        let file = file.map(Arc::new);
        match self.active_file.write() {
            Ok(mut guard) => *guard = file,
            Err(poisoned) => *poisoned.into_inner() = file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disabled_and_empty() {
        let state = EngineState::new();
        assert!(!state.is_enabled());
        assert!(state.active_file().is_none());
    }

    #[test]
    fn updates_are_visible_to_readers() {
        let state = Arc::new(EngineState::new());
        state.set_enabled(true);
        state.set_active_file(Some(ActiveFile::new("click.wav", "/s/click.wav")));

        let reader = state.clone();
        let seen = std::thread::spawn(move || (reader.is_enabled(), reader.active_file()))
            .join()
            .unwrap();
        assert!(seen.0);
        assert_eq!(seen.1.unwrap().name, "click.wav");

        state.set_active_file(None);
        assert!(state.active_file().is_none());
    }
}
