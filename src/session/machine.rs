use chrono::{DateTime, Utc};
use std::fs;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::state::{Command, FinalizedRecording, Notification, Segment, SessionState, Transition};
use super::stats::SessionStats;
use super::timing::{Clock, TimingAccumulator, TimingEvent};
use crate::audio::{SegmentEncoder, SegmentHandle};
use crate::error::{ErrorCode, PrepareError, SessionError};
use crate::stitch;

/// Segment currently held open by the encoder
struct OpenSegment {
    handle: SegmentHandle,
    path: PathBuf,
    created_at: DateTime<Utc>,
}

/// Data of one logical recording, from the first start until the next stop.
///
/// Replaced wholesale on reset, so the segment list is never partially
/// cleared.
#[derive(Default)]
struct RecordingSession {
    id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    segments: Vec<Segment>,
    open: Option<OpenSegment>,
    timing: TimingAccumulator,
}

/// Session state machine driving the encoder, timing and stitcher.
///
/// Every transition takes `&mut self`, so transitions cannot nest. Shared
/// owners must wrap the machine in a mutex and hold it for the whole call.
/// `Preparing` is held for the duration of a transition and is never
/// observable as the settled state.
pub struct RecordingMachine {
    config: SessionConfig,
    encoder: Box<dyn SegmentEncoder>,
    clock: Arc<dyn Clock>,
    state: SessionState,
    session: RecordingSession,
    notifications: broadcast::Sender<Notification>,
    stats: watch::Sender<SessionStats>,
}

impl RecordingMachine {
    pub fn new(config: SessionConfig, encoder: Box<dyn SegmentEncoder>, clock: Arc<dyn Clock>) -> Self {
        let (notifications, _) = broadcast::channel(64);
        let (stats, _) = watch::channel(SessionStats::stopped());

        Self {
            config,
            encoder,
            clock,
            state: SessionState::Stopped,
            session: RecordingSession::default(),
            notifications,
            stats,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Closed segments of the current recording, in capture order
    pub fn segments(&self) -> &[Segment] {
        &self.session.segments
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.id
    }

    /// Recorded time: closed segments plus the open interval while recording
    pub fn total_duration(&self) -> Duration {
        self.session.timing.total_at(self.clock.now())
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration().as_millis() as u64
    }

    /// Subscribe to state/finalize/error notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Watch the session snapshot (updated on every state change)
    pub fn watch_stats(&self) -> watch::Receiver<SessionStats> {
        self.stats.subscribe()
    }

    pub fn notifier(&self) -> broadcast::Sender<Notification> {
        self.notifications.clone()
    }

    /// Map a command onto the event it means in the current state
    pub fn handle(&mut self, command: Command) -> Result<Transition, SessionError> {
        match (command, self.state) {
            (Command::Start, SessionState::Paused) => self.resume(),
            (Command::Start, _) => self.start(),
            (Command::Pause, _) => self.pause(),
            (Command::Stop, _) => self.stop(),
        }
    }

    /// Stopped -> Recording: begin a new logical recording
    pub fn start(&mut self) -> Result<Transition, SessionError> {
        if self.state != SessionState::Stopped {
            debug!("Ignoring start while {}", self.state);
            return Ok(Transition::Ignored);
        }
        self.begin("start")?;

        self.session = RecordingSession {
            id: Some(Uuid::new_v4()),
            started_at: Some(Utc::now()),
            ..RecordingSession::default()
        };

        let opened = self
            .config
            .layout
            .ensure_dirs()
            .map_err(PrepareError::from)
            .and_then(|()| self.open_segment());

        if let Err(e) = opened {
            error!("Failed to start recording: {}", e);
            self.session = RecordingSession::default();
            self.settle(SessionState::Stopped);
            self.emit(Notification::Error { code: (&e).into() });
            return Err(e.into());
        }

        self.session.timing.on_event(TimingEvent::Start, self.clock.now());
        info!(
            "Recording started: session {}",
            self.session.id.map(|id| id.to_string()).unwrap_or_default()
        );
        self.settle(SessionState::Recording);
        Ok(Transition::Entered(SessionState::Recording))
    }

    /// Recording -> Paused: close the current segment
    pub fn pause(&mut self) -> Result<Transition, SessionError> {
        if self.state != SessionState::Recording {
            return self.reject("pause");
        }
        self.begin("pause")?;

        let now = self.clock.now();
        self.close_segment(TimingEvent::Pause, now);

        info!(
            "Recording paused: {} segments, {}ms recorded",
            self.session.segments.len(),
            self.total_duration_ms()
        );
        self.settle(SessionState::Paused);
        Ok(Transition::Entered(SessionState::Paused))
    }

    /// Paused -> Recording: open a new segment
    pub fn resume(&mut self) -> Result<Transition, SessionError> {
        if self.state != SessionState::Paused {
            return self.reject("resume");
        }
        self.begin("resume")?;

        if let Err(e) = self.open_segment() {
            error!("Failed to resume recording: {}", e);
            self.settle(SessionState::Paused);
            self.emit(Notification::Error { code: (&e).into() });
            return Err(e.into());
        }

        self.session.timing.on_event(TimingEvent::Resume, self.clock.now());
        info!("Recording resumed: segment {}", self.session.segments.len());
        self.settle(SessionState::Recording);
        Ok(Transition::Entered(SessionState::Recording))
    }

    /// Recording/Paused -> Stopped: close, stitch, finalize and reset.
    ///
    /// Blocks for the whole stitch.
    pub fn stop(&mut self) -> Result<Transition, SessionError> {
        if !matches!(self.state, SessionState::Recording | SessionState::Paused) {
            return self.reject("stop");
        }
        let before = self.begin("stop")?;

        let now = self.clock.now();
        if before == SessionState::Recording {
            self.close_segment(TimingEvent::Stop, now);
        } else {
            self.session.timing.on_event(TimingEvent::Stop, now);
        }

        let session = mem::take(&mut self.session);
        let duration = session.timing.closed();
        let paths: Vec<PathBuf> = session.segments.iter().map(|s| s.path.clone()).collect();
        let output = self.config.layout.next_output_path();

        let result = stitch::stitch(&paths, &output);
        self.settle(SessionState::Stopped);

        match result {
            Ok(report) => {
                for path in &report.skipped {
                    warn!("Keeping skipped segment {:?} for recovery", path);
                }
                if !self.config.keep_segments {
                    for path in paths.iter().filter(|p| !report.skipped.contains(p)) {
                        if let Err(e) = fs::remove_file(path) {
                            warn!("Failed to remove segment {:?}: {}", path, e);
                        }
                    }
                }

                let name = output
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let finalized = FinalizedRecording {
                    name,
                    output_path: output,
                    duration,
                    media_duration: report.media_duration(),
                    segments_used: report.segments_used,
                    segments_skipped: report.skipped.len(),
                };

                info!(
                    "Recording finalized: {:?} ({}ms recorded, {:.2}s media, {} segments)",
                    finalized.output_path,
                    finalized.duration_ms(),
                    finalized.media_duration.as_secs_f64(),
                    finalized.segments_used
                );

                self.emit(Notification::Finalized {
                    output_path: finalized.output_path.clone(),
                    duration_ms: finalized.duration_ms(),
                });
                Ok(Transition::Finalized(finalized))
            }
            Err(e) => {
                error!(
                    "Finalize failed, {} raw segments kept on disk: {}",
                    paths.len(),
                    e
                );
                self.emit(Notification::Error { code: (&e).into() });
                Err(e.into())
            }
        }
    }

    /// Enter the transition guard, returning the state it replaced
    fn begin(&mut self, event: &'static str) -> Result<SessionState, SessionError> {
        if self.state == SessionState::Preparing {
            let err = SessionError::InvalidTransition {
                state: self.state,
                event,
            };
            error!("{}", err);
            debug_assert!(false, "re-entrant transition: {event}");
            self.emit(Notification::Error {
                code: ErrorCode::InvalidTransition,
            });
            return Err(err);
        }

        let before = self.state;
        self.state = SessionState::Preparing;
        self.publish_stats();
        Ok(before)
    }

    /// Handle an event that does not apply to the current state
    fn reject(&mut self, event: &'static str) -> Result<Transition, SessionError> {
        if self.state == SessionState::Preparing {
            self.begin(event)?;
        }
        debug!("Ignoring {} while {}", event, self.state);
        Ok(Transition::Ignored)
    }

    /// Leave the guard and announce the new state
    fn settle(&mut self, state: SessionState) {
        info!("State -> {}", state);
        self.state = state;
        self.publish_stats();

        let now = self.clock.now();
        let elapsed = self.session.timing.total_at(now);
        self.emit(Notification::StateChanged {
            state,
            chronometer_base: now.checked_sub(elapsed).unwrap_or(now),
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    fn open_segment(&mut self) -> Result<(), PrepareError> {
        let id = self.session.id.unwrap_or_else(Uuid::nil);
        let path = self.config.layout.segment_path(&id, self.session.segments.len());
        let handle = self.encoder.open(&path, &self.config.quality)?;

        self.session.open = Some(OpenSegment {
            handle,
            path,
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Close the open segment and append it, even if the encoder fails
    fn close_segment(&mut self, event: TimingEvent, at: Instant) {
        let Some(open) = self.session.open.take() else {
            warn!("No open segment to close");
            return;
        };

        let recorded = self
            .session
            .timing
            .on_event(event, at)
            .unwrap_or_default();

        let encoded = match self.encoder.close(open.handle) {
            Ok(duration) => Some(duration),
            Err(e) => {
                warn!("Salvaging segment {:?} after close failure: {}", open.path, e);
                self.emit(Notification::Error {
                    code: ErrorCode::CloseFailed,
                });
                None
            }
        };

        self.session.segments.push(Segment {
            path: open.path,
            created_at: open.created_at,
            recorded,
            encoded,
        });
    }

    fn publish_stats(&self) {
        let session = &self.session;
        let snapshot = SessionStats {
            state: self.state,
            session_id: session.id,
            started_at: session.started_at,
            segments_count: session.segments.len(),
            recorded_ms: session.timing.closed().as_millis() as u64,
            running_since: session.timing.running_since(),
        };
        self.stats.send_replace(snapshot);
    }

    fn emit(&self, notification: Notification) {
        // No subscribers is fine: delivery is fire-and-forget.
        let _ = self.notifications.send(notification);
    }
}

impl Drop for RecordingMachine {
    fn drop(&mut self) {
        if let Some(open) = self.session.open.take() {
            warn!("Recording machine dropped with an open segment {:?}", open.path);
            if let Err(e) = self.encoder.close(open.handle) {
                warn!("Failed to close segment on drop: {}", e);
            }
        }
    }
}
