//! Playback of finalized recordings with output-focus arbitration

mod controller;
mod focus;
mod player;

pub use controller::{OutputRoute, PlaybackController, PlaybackEvent};
pub use focus::{FocusArbiter, FocusChange, FocusProvider, FocusState, LocalFocus, Playback, DUCK_VOLUME};
pub use player::{Player, PlayerState};
