//! Audio Playback Engine
//!
//! Turns a file path into an independent, fire-and-forget playback
//! instance. Every instance runs on its own thread with its own player
//! resources, so any number of them may overlap.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use super::{PlaybackId, SoundPlayer};
use crate::error::PlaybackError;

/// Spawns playback instances
pub struct AudioPlaybackEngine {
    player: Arc<dyn SoundPlayer>,
    next_id: AtomicU64,
    live: Arc<AtomicUsize>,
}

impl AudioPlaybackEngine {
    pub fn new(player: Arc<dyn SoundPlayer>) -> Self {
        Self {
            player,
            next_id: AtomicU64::new(1),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of instances currently playing.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Start one playback of `path` without waiting for it.
    ///
    /// Only failure to spawn the instance is returned; open, decode and
    /// device errors are logged by the instance itself.
    pub fn play(&self, path: &Path) -> Result<PlaybackId, PlaybackError> {
        let id = PlaybackId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let player = self.player.clone();
        let path: PathBuf = path.to_path_buf();
        let guard = LiveGuard::new(self.live.clone());

        thread::Builder::new()
            .name(format!("playback-{}", id.0))
            .spawn(move || {
                let _guard = guard;
                run_instance(player.as_ref(), id, &path);
            })
            .map_err(|e| {
                tracing::error!(playback_id = %id, "Failed to spawn playback thread: {}", e);
                PlaybackError::SpawnFailed(e)
            })?;

        Ok(id)
    }
}

fn run_instance(player: &dyn SoundPlayer, id: PlaybackId, path: &Path) {
    let started = Instant::now();
    tracing::debug!(playback_id = %id, file = %path.display(), "Playback task started");

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        player.play_to_end(id, path)
    }))
    .unwrap_or_else(|panic| Err(PlaybackError::Panicked(panic_message(panic.as_ref()))));

    match result {
        Ok(()) => tracing::debug!(
            playback_id = %id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Playback finished"
        ),
        Err(e) => tracing::warn!(playback_id = %id, "Playback failed: {}", e),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Counts an instance as live until dropped, whatever path the thread takes.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
