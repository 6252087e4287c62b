use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::error::ErrorCode;

/// Recording session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Stopped,
    /// Held only while a transition is in progress
    Preparing,
    Recording,
    Paused,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Preparing => "preparing",
            Self::Recording => "recording",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// One contiguous interval of captured audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Temporary container file written by the encoder
    pub path: PathBuf,

    /// When the segment was opened
    pub created_at: DateTime<Utc>,

    /// Recorded length on the monotonic clock
    pub recorded: Duration,

    /// Length reported by the encoder, `None` when close failed
    pub encoded: Option<Duration>,
}

/// Commands accepted by the session service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Start a recording, or resume a paused one
    Start,
    Pause,
    Stop,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "record" | "resume" => Ok(Self::Start),
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            other => Err(format!("unknown command: {other:?}")),
        }
    }
}

/// Fire-and-forget events published by the session
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The session settled into a new state
    StateChanged {
        state: SessionState,
        /// Monotonic instant at which a running timer would read zero
        chronometer_base: Instant,
        elapsed_ms: u64,
    },

    /// A recording was finalized into one output file
    Finalized { output_path: PathBuf, duration_ms: u64 },

    Error { code: ErrorCode },
}

/// Result of a successful finalize
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedRecording {
    /// File name shown in the catalogue
    pub name: String,
    pub output_path: PathBuf,
    /// Recorded time across all segments (monotonic clock)
    pub duration: Duration,
    /// Media time actually present in the output
    pub media_duration: Duration,
    pub segments_used: usize,
    pub segments_skipped: usize,
}

impl FinalizedRecording {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Outcome of handling one event
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Duplicate or out-of-place event; nothing changed
    Ignored,
    /// The machine settled into a new state
    Entered(SessionState),
    /// The recording was stopped and stitched
    Finalized(FinalizedRecording),
}
