use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::focus::Playback;
use crate::audio::AudioFile;
use crate::session::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Paused,
}

/// Transport for one finalized recording.
///
/// Tracks position on the monotonic clock; rendering samples to a device is
/// left to the platform.
pub struct Player {
    file: AudioFile,
    clock: Arc<dyn Clock>,
    state: PlayerState,
    /// Position at the last pause/seek
    position: Duration,
    playing_since: Option<Instant>,
    volume: f32,
}

impl Player {
    pub fn new(file: AudioFile, clock: Arc<dyn Clock>) -> Self {
        Self {
            file,
            clock,
            state: PlayerState::Stopped,
            position: Duration::ZERO,
            playing_since: None,
            volume: 1.0,
        }
    }

    /// Probe `path` and create a stopped player for it
    pub fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::new(AudioFile::open(path)?, clock))
    }

    pub fn file(&self) -> &AudioFile {
        &self.file
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn duration(&self) -> Duration {
        self.file.duration()
    }

    pub fn position(&self) -> Duration {
        let running = self
            .playing_since
            .map(|since| self.clock.now().saturating_duration_since(since))
            .unwrap_or_default();
        (self.position + running).min(self.duration())
    }

    /// Start from the current position (the beginning after a stop)
    pub fn play(&mut self) {
        match self.state {
            PlayerState::Playing => {}
            PlayerState::Paused => self.resume(),
            PlayerState::Stopped => {
                info!("Playing {:?}", self.file.path);
                self.playing_since = Some(self.clock.now());
                self.state = PlayerState::Playing;
            }
        }
    }

    pub fn stop(&mut self) {
        if self.state == PlayerState::Stopped {
            return;
        }
        info!("Stopped {:?}", self.file.path);
        self.state = PlayerState::Stopped;
        self.playing_since = None;
        self.position = Duration::ZERO;
    }

    pub fn seek(&mut self, to: Duration) {
        self.position = to.min(self.duration());
        if self.playing_since.is_some() {
            self.playing_since = Some(self.clock.now());
        }
        debug!("Seeked to {}ms", self.position.as_millis());
    }

    /// Stop when the end is reached; returns `true` if playback completed
    pub fn poll_completion(&mut self) -> bool {
        if self.state == PlayerState::Playing && self.position() >= self.duration() {
            self.stop();
            return true;
        }
        false
    }

    fn freeze(&mut self) {
        self.position = self.position();
        self.playing_since = None;
    }
}

impl Playback for Player {
    fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    fn pause(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }
        self.freeze();
        self.state = PlayerState::Paused;
        debug!("Paused at {}ms", self.position.as_millis());
    }

    fn resume(&mut self) {
        if self.state != PlayerState::Paused {
            return;
        }
        self.playing_since = Some(self.clock.now());
        self.state = PlayerState::Playing;
        debug!("Resumed at {}ms", self.position.as_millis());
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}
