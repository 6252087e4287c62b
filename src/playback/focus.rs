use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::FocusError;

/// Default output volume while ducked
pub const DUCK_VOLUME: f32 = 0.2;

/// External change in output-device focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gain,
    /// Lost for good (another app took over playback)
    Loss,
    /// Lost briefly (e.g. a call); expect a `Gain` later
    LossTransient,
    /// Lost briefly but quieter playback may continue
    LossTransientCanDuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    Unfocused,
    Focused,
}

/// System-side focus arbitration (the OS mixer)
pub trait FocusProvider: Send {
    /// Ask for exclusive output; `true` when granted
    fn request_focus(&mut self) -> bool;

    /// Give focus back; `true` when released
    fn abandon_focus(&mut self) -> bool;

    /// Whether the platform lowers our volume itself on duckable loss
    fn ducks_automatically(&self) -> bool {
        false
    }
}

/// Something that plays audio and can be paused by the arbiter
pub trait Playback: Send {
    fn is_playing(&self) -> bool;
    fn pause(&mut self);
    fn resume(&mut self);
    fn set_volume(&mut self, volume: f32);
}

/// Live hold on the output device
#[derive(Debug)]
struct FocusToken {
    id: u64,
    acquired_at: Instant,
}

/// Arbitrates exclusive use of the output device around playback.
///
/// Holds at most one token; only one focus request is outstanding at a time.
pub struct FocusArbiter<F: FocusProvider> {
    provider: F,
    token: Option<FocusToken>,
    resume_on_gain_pending: bool,
    duck_volume: f32,
    next_token: u64,
}

impl<F: FocusProvider> FocusArbiter<F> {
    pub fn new(provider: F) -> Self {
        Self::with_duck_volume(provider, DUCK_VOLUME)
    }

    pub fn with_duck_volume(provider: F, duck_volume: f32) -> Self {
        Self {
            provider,
            token: None,
            resume_on_gain_pending: false,
            duck_volume: duck_volume.clamp(0.0, 1.0),
            next_token: 0,
        }
    }

    pub fn state(&self) -> FocusState {
        if self.token.is_some() {
            FocusState::Focused
        } else {
            FocusState::Unfocused
        }
    }

    pub fn is_focused(&self) -> bool {
        self.token.is_some()
    }

    pub fn resume_on_gain_pending(&self) -> bool {
        self.resume_on_gain_pending
    }

    pub fn provider(&self) -> &F {
        &self.provider
    }

    /// Acquire focus; a no-op when already focused
    pub fn acquire(&mut self) -> Result<(), FocusError> {
        if self.token.is_some() {
            return Ok(());
        }

        if !self.provider.request_focus() {
            warn!("Audio focus request denied");
            return Err(FocusError::RequestFailed);
        }

        self.grant();
        Ok(())
    }

    /// Release focus and drop any pending auto-resume
    pub fn release(&mut self) {
        self.resume_on_gain_pending = false;

        if let Some(token) = self.token.take() {
            if self.provider.abandon_focus() {
                debug!(
                    "Released focus token {} after {:.1}s",
                    token.id,
                    token.acquired_at.elapsed().as_secs_f64()
                );
            } else {
                warn!("System did not confirm focus release for token {}", token.id);
            }
        }
    }

    /// React to a focus change published by the system
    pub fn on_focus_change(&mut self, change: FocusChange, playback: &mut dyn Playback) {
        debug!("Focus change: {:?}", change);

        match change {
            FocusChange::Loss => {
                info!("Focus lost: pausing playback");
                self.token = None;
                playback.pause();
                self.resume_on_gain_pending = false;
            }
            FocusChange::LossTransient => {
                info!("Focus lost transiently: pausing playback");
                let resume = playback.is_playing() || self.resume_on_gain_pending;
                self.token = None;
                playback.pause();
                self.resume_on_gain_pending = resume;
            }
            FocusChange::LossTransientCanDuck => {
                if self.provider.ducks_automatically() {
                    info!("Focus lost transiently (can duck): letting system duck");
                } else {
                    info!("Focus lost transiently (can duck): ducking to {}", self.duck_volume);
                    playback.set_volume(self.duck_volume);
                }
            }
            FocusChange::Gain => {
                info!("Focus gained: restoring volume");
                if self.token.is_none() {
                    self.grant();
                }
                playback.set_volume(1.0);
                if self.resume_on_gain_pending {
                    playback.resume();
                }
                self.resume_on_gain_pending = false;
            }
        }
    }

    fn grant(&mut self) {
        let id = self.next_token;
        self.next_token += 1;
        self.token = Some(FocusToken {
            id,
            acquired_at: Instant::now(),
        });
        debug!("Acquired focus token {}", id);
    }
}

/// Provider for platforms without a system focus manager: focus is always
/// granted and held until abandoned.
#[derive(Debug, Default)]
pub struct LocalFocus {
    held: bool,
}

impl FocusProvider for LocalFocus {
    fn request_focus(&mut self) -> bool {
        self.held = true;
        true
    }

    fn abandon_focus(&mut self) -> bool {
        std::mem::replace(&mut self.held, false)
    }
}
