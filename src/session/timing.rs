use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// System monotonic clock (`Instant::now`)
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic timing
#[derive(Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    /// Jump to an absolute offset from the clock's origin (never backwards)
    pub fn set_elapsed(&self, elapsed: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset = (*offset).max(elapsed);
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("elapsed", &(self.now() - self.origin))
            .finish()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

/// Events that affect recorded time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingEvent {
    Start,
    Pause,
    Resume,
    Stop,
}

/// Cumulative recorded duration across pause gaps.
///
/// Closed intervals are summed into `closed`; the open interval (if any)
/// runs from `running_since`. Timestamps earlier than the interval start
/// count as zero length.
#[derive(Debug, Clone, Default)]
pub struct TimingAccumulator {
    closed: Duration,
    running_since: Option<Instant>,
}

impl TimingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event; returns the length of the interval it closed, if any
    pub fn on_event(&mut self, event: TimingEvent, at: Instant) -> Option<Duration> {
        match event {
            TimingEvent::Start => {
                self.closed = Duration::ZERO;
                self.running_since = Some(at);
                None
            }
            TimingEvent::Resume => {
                if self.running_since.is_none() {
                    self.running_since = Some(at);
                }
                None
            }
            TimingEvent::Pause | TimingEvent::Stop => {
                let since = self.running_since.take()?;
                let interval = at.saturating_duration_since(since);
                self.closed += interval;
                Some(interval)
            }
        }
    }

    /// Total recorded time as of `at`
    pub fn total_at(&self, at: Instant) -> Duration {
        match self.running_since {
            Some(since) => self.closed + at.saturating_duration_since(since),
            None => self.closed,
        }
    }

    /// Sum of closed intervals only
    pub fn closed(&self) -> Duration {
        self.closed
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn running_since(&self) -> Option<Instant> {
        self.running_since
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
