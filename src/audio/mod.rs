//! Audio playback: the fire-and-forget engine and its per-instance player

mod engine;
mod player;

pub use engine::AudioPlaybackEngine;
pub use player::{default_output_device_name, RodioPlayer, SoundPlayer};

use std::fmt;

/// Identifies one playback instance in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaybackId(pub u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
