//! Recording session management
//!
//! This module provides the pause/resume recording pipeline:
//! - `RecordingMachine`: state machine over Stopped/Preparing/Recording/Paused
//! - `TimingAccumulator`: recorded time across pause gaps (monotonic clock)
//! - `SessionService`: ordered command channel in front of the machine
//! - Storage layout, notifications and session statistics

mod config;
mod machine;
mod service;
mod state;
mod stats;
mod timing;

pub use config::{SessionConfig, StorageLayout};
pub use machine::RecordingMachine;
pub use service::{SessionHandle, SessionService};
pub use state::{Command, FinalizedRecording, Notification, Segment, SessionState, Transition};
pub use stats::SessionStats;
pub use timing::{Clock, ManualClock, MonotonicClock, TimingAccumulator, TimingEvent};
