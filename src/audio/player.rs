//! Single-instance sound playback using rodio
//!
//! One call plays one file once, start to finish, on its own output
//! stream and decoder. Nothing is shared between calls.

use cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use super::PlaybackId;
use crate::error::PlaybackError;

/// One decode+play cycle for one file.
pub trait SoundPlayer: Send + Sync {
    /// Play `path` to completion, blocking the calling thread.
    ///
    /// All decoder and output resources must be released before returning,
    /// on success and on error.
    fn play_to_end(&self, id: PlaybackId, path: &Path) -> Result<(), PlaybackError>;
}

/// Name of the default output device, if the host has one.
pub fn default_output_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device()
        .map(|device| device.name().unwrap_or_else(|_| "<unnamed>".to_string()))
}

/// rodio backed player: a fresh `OutputStream` + `Sink` per instance
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioPlayer;

impl RodioPlayer {
    pub fn new() -> Self {
        match default_output_device_name() {
            Some(name) => tracing::info!("Default output device: {}", name),
            None => tracing::warn!("No default output device found, playback will fail"),
        }
        Self
    }
}

impl SoundPlayer for RodioPlayer {
    fn play_to_end(&self, id: PlaybackId, path: &Path) -> Result<(), PlaybackError> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                PlaybackError::FileMissing(path.to_path_buf())
            } else {
                PlaybackError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let source = Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::DecodeFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
        let sink =
            Sink::try_new(&handle).map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;

        sink.set_volume(1.0);
        sink.append(source);
        tracing::debug!(playback_id = %id, "Playback started");

        sink.sleep_until_end();

        drop(sink);
        drop(stream);
        tracing::debug!(playback_id = %id, "Playback resources released");
        Ok(())
    }
}
