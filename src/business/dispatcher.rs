//! Playback Dispatcher
//!
//! Runs inside the OS hook callback. It only reads the shared flags, stats
//! the active file and hands the path to the engine, which plays it on a
//! separate thread. Every qualifying key-down schedules its own playback;
//! nothing is de-duplicated or rate-limited.

use std::sync::Arc;

use crate::audio::{AudioPlaybackEngine, PlaybackId};
use crate::business::EngineState;
use crate::platform::{KeyDown, KeyListener};

/// What a single key-down turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Disabled,
    NoActiveFile,
    FileMissing,
    Scheduled(PlaybackId),
    ScheduleFailed,
}

pub struct PlaybackDispatcher {
    state: Arc<EngineState>,
    engine: Arc<AudioPlaybackEngine>,
}

impl PlaybackDispatcher {
    pub fn new(state: Arc<EngineState>, engine: Arc<AudioPlaybackEngine>) -> Self {
        Self { state, engine }
    }

    pub fn on_key_down(&self, key: KeyDown) -> DispatchOutcome {
        tracing::trace!(key_code = key.key_code, "Key down");

        if !self.state.is_enabled() {
            return DispatchOutcome::Disabled;
        }

        let Some(active) = self.state.active_file() else {
            tracing::debug!("No sound file configured, ignoring key press");
            return DispatchOutcome::NoActiveFile;
        };

        if !active.path().is_file() {
            tracing::warn!("Sound file does not exist: {}", active.path().display());
            return DispatchOutcome::FileMissing;
        }

        match self.engine.play(active.path()) {
            Ok(id) => {
                tracing::debug!(playback_id = %id, key_code = key.key_code, "Playback scheduled");
                DispatchOutcome::Scheduled(id)
            }
            Err(e) => {
                tracing::error!("Failed to schedule playback: {}", e);
                DispatchOutcome::ScheduleFailed
            }
        }
    }

    /// Listener to hand to the input hook.
    pub fn listener(self: &Arc<Self>) -> KeyListener {
        let dispatcher = Arc::clone(self);
        Arc::new(move |key| {
            dispatcher.on_key_down(key);
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::audio::{PlaybackId, SoundPlayer};
    use crate::error::PlaybackError;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Records every instance it is asked to play.
    #[derive(Default)]
    pub struct RecordingPlayer {
        pub calls: Mutex<Vec<(PlaybackId, PathBuf)>>,
    }

    impl RecordingPlayer {
        pub fn count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl SoundPlayer for RecordingPlayer {
        fn play_to_end(&self, id: PlaybackId, path: &Path) -> Result<(), PlaybackError> {
            self.calls.lock().unwrap().push((id, path.to_path_buf()));
            Ok(())
        }
    }
}
