//! Article audio playback.
//!
//! The speech endpoint returns raw interleaved 16-bit little-endian PCM.
//! [`decode_pcm16`] turns it into normalized samples and [`AudioSession`]
//! drives playback through a [`PlaybackBackend`] as an explicit state
//! machine:
//!
//! ```text
//!  Idle ──start──▶ Generating ──audio──▶ Playing ◀──resume── Paused
//!   ▲                  │                   │ └────pause────────▲
//!   │                no data               │                   │
//!   │                  ▼                   │                   │
//!   │                Error                 │                   │
//!   └──────────────── on_complete ─────────┴───────────────────┘
//! ```
//!
//! At most one playback handle is owned at a time. It is stopped and
//! closed on natural completion and when the session is dropped.

use std::fmt;

use serde::Serialize;

/// Sample rate of the speech endpoint's PCM output.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
/// Channel count of the speech endpoint's PCM output.
pub const SPEECH_CHANNELS: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("audio generation returned no data")]
    NoData,
    #[error("PCM payload has odd length {0}")]
    OddLength(usize),
    #[error("channel count must be at least 1")]
    InvalidChannels,
    #[error("playback backend failed: {0}")]
    Backend(String),
    #[error("cannot {action} while {state}")]
    InvalidState { action: &'static str, state: AudioState },
}

/// Decoded PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    /// Interleaved samples in `[-1.0, 1.0)`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples converted back to 16-bit integers.
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|s| (s * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect()
    }
}

/// Decode interleaved 16-bit little-endian PCM.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<PcmClip, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::NoData);
    }
    if bytes.len() % 2 != 0 {
        return Err(AudioError::OddLength(bytes.len()));
    }
    if channels == 0 {
        return Err(AudioError::InvalidChannels);
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(PcmClip {
        samples,
        sample_rate,
        channels,
    })
}

/// A device or sink that can play a decoded clip.
pub trait PlaybackBackend {
    type Handle: PlaybackHandle;

    /// Acquire a playback resource and start playing `clip`.
    fn open(&mut self, clip: PcmClip) -> Result<Self::Handle, AudioError>;
}

/// One acquired playback resource (decoding context plus source).
pub trait PlaybackHandle {
    fn suspend(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioState {
    Idle,
    Generating,
    Playing,
    Paused,
    Error,
}

impl fmt::Display for AudioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Label and availability of the audio trigger for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioControl {
    pub label: &'static str,
    pub enabled: bool,
}

/// Playback state machine owning at most one backend handle.
pub struct AudioSession<B: PlaybackBackend> {
    backend: B,
    state: AudioState,
    handle: Option<B::Handle>,
}

impl<B: PlaybackBackend> AudioSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: AudioState::Idle,
            handle: None,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn control(&self) -> AudioControl {
        let (label, enabled) = match self.state {
            AudioState::Idle => ("Listen to Article", true),
            AudioState::Generating => ("Generating Audio...", false),
            AudioState::Playing => ("Pause Audio", true),
            AudioState::Paused => ("Resume Audio", true),
            AudioState::Error => ("Audio Error", false),
        };
        AudioControl { label, enabled }
    }

    /// Begin generation. Only possible while idle.
    pub fn start(&mut self) -> Result<(), AudioError> {
        self.expect(AudioState::Idle, "start")?;
        self.state = AudioState::Generating;
        Ok(())
    }

    /// Hand over the generated audio (or its absence) and begin playback.
    ///
    /// Missing or undecodable audio moves the session to `Error`.
    pub fn finish_generation(&mut self, audio: Option<Vec<u8>>) -> Result<(), AudioError> {
        self.expect(AudioState::Generating, "finish generation")?;

        let result = audio
            .ok_or(AudioError::NoData)
            .and_then(|bytes| decode_pcm16(&bytes, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS))
            .and_then(|clip| self.backend.open(clip));

        match result {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = AudioState::Playing;
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to play audio");
                self.state = AudioState::Error;
                Err(err)
            }
        }
    }

    pub fn pause(&mut self) -> Result<(), AudioError> {
        self.expect(AudioState::Playing, "pause")?;
        if let Some(handle) = self.handle.as_mut() {
            handle.suspend();
        }
        self.state = AudioState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), AudioError> {
        self.expect(AudioState::Paused, "resume")?;
        if let Some(handle) = self.handle.as_mut() {
            handle.resume();
        }
        self.state = AudioState::Playing;
        Ok(())
    }

    /// Natural end of playback: release the handle and return to idle.
    pub fn on_complete(&mut self) {
        if matches!(self.state, AudioState::Playing | AudioState::Paused) {
            self.release();
            self.state = AudioState::Idle;
        }
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
            handle.close();
        }
    }

    fn expect(&self, state: AudioState, action: &'static str) -> Result<(), AudioError> {
        if self.state == state {
            Ok(())
        } else {
            Err(AudioError::InvalidState {
                action,
                state: self.state,
            })
        }
    }
}

impl<B: PlaybackBackend> Drop for AudioSession<B> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log(Rc<RefCell<Vec<&'static str>>>);

    struct RecordingBackend {
        log: Rc<RefCell<Vec<&'static str>>>,
        frames: Rc<RefCell<usize>>,
    }

    struct RecordingHandle {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl PlaybackBackend for RecordingBackend {
        type Handle = RecordingHandle;

        fn open(&mut self, clip: PcmClip) -> Result<RecordingHandle, AudioError> {
            *self.frames.borrow_mut() = clip.frames();
            self.log.borrow_mut().push("open");
            Ok(RecordingHandle {
                log: self.log.clone(),
            })
        }
    }

    impl PlaybackHandle for RecordingHandle {
        fn suspend(&mut self) {
            self.log.borrow_mut().push("suspend");
        }
        fn resume(&mut self) {
            self.log.borrow_mut().push("resume");
        }
        fn stop(&mut self) {
            self.log.borrow_mut().push("stop");
        }
        fn close(&mut self) {
            self.log.borrow_mut().push("close");
        }
    }

    fn session() -> (AudioSession<RecordingBackend>, Log) {
        let log = Log::default();
        let backend = RecordingBackend {
            log: log.0.clone(),
            frames: Rc::new(RefCell::new(0)),
        };
        (AudioSession::new(backend), log)
    }

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_pcm16() {
        let clip = decode_pcm16(&pcm(&[0, 16384, -32768]), 24_000, 1).unwrap();
        assert_eq!(clip.samples, vec![0.0, 0.5, -1.0]);
        assert_eq!(clip.frames(), 3);
        assert_eq!(clip.to_i16(), vec![0, 16384, -32768]);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert_eq!(decode_pcm16(&[], 24_000, 1), Err(AudioError::NoData));
        assert_eq!(decode_pcm16(&[1, 2, 3], 24_000, 1), Err(AudioError::OddLength(3)));
        assert_eq!(decode_pcm16(&[1, 2], 24_000, 0), Err(AudioError::InvalidChannels));
    }

    #[test]
    fn test_full_lifecycle() {
        let (mut s, log) = session();
        assert_eq!(s.control().label, "Listen to Article");

        s.start().unwrap();
        assert_eq!(s.control(), AudioControl { label: "Generating Audio...", enabled: false });
        assert!(s.start().is_err());

        s.finish_generation(Some(pcm(&[1, 2, 3, 4]))).unwrap();
        assert_eq!(s.state(), AudioState::Playing);
        assert_eq!(*s.backend().frames.borrow(), 4);

        s.pause().unwrap();
        assert_eq!(s.control().label, "Resume Audio");
        s.resume().unwrap();
        assert_eq!(s.control().label, "Pause Audio");

        s.on_complete();
        assert_eq!(s.state(), AudioState::Idle);
        assert_eq!(*log.0.borrow(), vec!["open", "suspend", "resume", "stop", "close"]);

        // Idle again: another run is possible.
        s.start().unwrap();
    }

    #[test]
    fn test_no_data_is_an_error_state() {
        let (mut s, log) = session();
        s.start().unwrap();
        assert_eq!(s.finish_generation(None), Err(AudioError::NoData));
        assert_eq!(s.state(), AudioState::Error);
        assert!(!s.control().enabled);
        assert!(s.start().is_err());
        assert!(log.0.borrow().is_empty());
    }

    #[test]
    fn test_drop_releases_handle() {
        let (mut s, log) = session();
        s.start().unwrap();
        s.finish_generation(Some(pcm(&[1, 2]))).unwrap();
        s.pause().unwrap();
        drop(s);
        assert_eq!(*log.0.borrow(), vec!["open", "suspend", "stop", "close"]);
    }

    #[test]
    fn test_pause_requires_playing() {
        let (mut s, _log) = session();
        assert_eq!(
            s.pause(),
            Err(AudioError::InvalidState { action: "pause", state: AudioState::Idle })
        );
    }
}
