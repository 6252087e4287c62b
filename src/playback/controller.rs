use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::focus::{FocusArbiter, FocusChange, FocusProvider, Playback};
use super::player::{Player, PlayerState};
use crate::error::FocusError;

/// Output routing changes (headset plug, speaker fallback)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRoute {
    /// Audio is about to come out of the loudspeaker
    BecomingNoisy,
    HeadsetUnplugged,
    HeadsetPlugged,
}

/// Everything that can happen to playback, delivered on one ordered channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Play,
    Pause,
    Stop,
    Seek(Duration),
    Focus(FocusChange),
    Route(OutputRoute),
}

/// Drives a player and its focus arbiter from playback events
pub struct PlaybackController<F: FocusProvider> {
    player: Player,
    arbiter: FocusArbiter<F>,
}

impl<F: FocusProvider> PlaybackController<F> {
    pub fn new(player: Player, arbiter: FocusArbiter<F>) -> Self {
        Self { player, arbiter }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn arbiter(&self) -> &FocusArbiter<F> {
        &self.arbiter
    }

    /// Apply one event
    pub fn handle(&mut self, event: PlaybackEvent) -> Result<(), FocusError> {
        match event {
            PlaybackEvent::Play => {
                if self.player.state() == PlayerState::Playing {
                    return Ok(());
                }
                self.arbiter.acquire()?;
                self.player.play();
            }
            PlaybackEvent::Pause => {
                self.player.pause();
                self.arbiter.release();
            }
            PlaybackEvent::Stop => {
                self.player.stop();
                self.arbiter.release();
            }
            PlaybackEvent::Seek(to) => self.player.seek(to),
            PlaybackEvent::Focus(change) => self.arbiter.on_focus_change(change, &mut self.player),
            PlaybackEvent::Route(OutputRoute::BecomingNoisy | OutputRoute::HeadsetUnplugged) => {
                info!("Output route changed to speaker: pausing playback");
                self.player.pause();
                self.arbiter.release();
            }
            PlaybackEvent::Route(OutputRoute::HeadsetPlugged) => {
                debug!("Headset plugged; playback unchanged");
            }
        }
        Ok(())
    }

    /// Release focus once the player has reached the end
    pub fn check_completion(&mut self) -> bool {
        if self.player.poll_completion() {
            info!("Playback complete");
            self.arbiter.release();
            return true;
        }
        false
    }

    /// Consume events until the channel closes, then stop and hand back
    /// the controller
    pub async fn run(mut self, mut events: mpsc::Receiver<PlaybackEvent>) -> Self {
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle(event) {
                            warn!("Playback event {:?} failed: {}", event, e);
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    self.check_completion();
                }
            }
        }

        self.player.stop();
        self.arbiter.release();
        self
    }
}
