//! WAV file playback backend.
//!
//! The terminal has no audio device to drive, so "playing" a clip means
//! writing it out as a 16-bit PCM WAV file that any player can open. The
//! handle only tracks the lifecycle for logging.

use std::path::{Path, PathBuf};

use bylines_core::audio::{AudioError, PcmClip, PlaybackBackend, PlaybackHandle};

/// Encode a clip as a canonical 44-byte-header PCM WAV.
pub fn encode_wav(clip: &PcmClip) -> Vec<u8> {
    let samples = clip.to_i16();
    let data_len = (samples.len() * 2) as u32;
    let block_align = clip.channels * 2;
    let byte_rate = clip.sample_rate * block_align as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&clip.channels.to_le_bytes());
    out.extend_from_slice(&clip.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Writes each opened clip to `path`.
#[derive(Debug)]
pub struct WavBackend {
    path: PathBuf,
    last_duration: Option<f64>,
}

impl WavBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_duration: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration in seconds of the most recently written clip.
    pub fn last_duration(&self) -> Option<f64> {
        self.last_duration
    }
}

impl PlaybackBackend for WavBackend {
    type Handle = WavHandle;

    fn open(&mut self, clip: PcmClip) -> Result<WavHandle, AudioError> {
        std::fs::write(&self.path, encode_wav(&clip))
            .map_err(|e| AudioError::Backend(format!("{}: {}", self.path.display(), e)))?;

        self.last_duration = Some(clip.duration_secs());
        tracing::info!(
            path = %self.path.display(),
            seconds = clip.duration_secs(),
            "wrote article audio"
        );
        Ok(WavHandle {
            path: self.path.clone(),
            open: true,
        })
    }
}

#[derive(Debug)]
pub struct WavHandle {
    path: PathBuf,
    open: bool,
}

impl PlaybackHandle for WavHandle {
    fn suspend(&mut self) {
        tracing::debug!(path = %self.path.display(), "playback suspended");
    }

    fn resume(&mut self) {
        tracing::debug!(path = %self.path.display(), "playback resumed");
    }

    fn stop(&mut self) {
        tracing::debug!(path = %self.path.display(), "playback stopped");
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            tracing::debug!(path = %self.path.display(), "playback closed");
        }
    }
}
