use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::state::SessionState;

/// Snapshot of a recording session, published after every state change
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Current state (including `Preparing` while a transition runs)
    pub state: SessionState,

    /// Identifier of the logical recording, if one is active
    pub session_id: Option<Uuid>,

    /// Wall-clock start of the logical recording (display only)
    pub started_at: Option<DateTime<Utc>>,

    /// Number of closed segments
    pub segments_count: usize,

    /// Recorded time of closed segments in milliseconds
    pub recorded_ms: u64,

    /// Start of the open interval while recording
    #[serde(skip)]
    pub running_since: Option<Instant>,
}

impl SessionStats {
    pub fn stopped() -> Self {
        Self {
            state: SessionState::Stopped,
            session_id: None,
            started_at: None,
            segments_count: 0,
            recorded_ms: 0,
            running_since: None,
        }
    }

    /// Total recorded time as of `now`
    pub fn total_duration_at(&self, now: Instant) -> Duration {
        let closed = Duration::from_millis(self.recorded_ms);
        match self.running_since {
            Some(since) => closed + now.saturating_duration_since(since),
            None => closed,
        }
    }
}
