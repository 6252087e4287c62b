use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::machine::RecordingMachine;
use super::state::{Command, Notification, SessionState, Transition};
use super::stats::SessionStats;
use super::timing::Clock;
use crate::catalogue::Catalogue;
use crate::error::SessionError;

type Reply = oneshot::Sender<Result<Transition, SessionError>>;

/// A queued command and, for `dispatch`, where to send its outcome
struct Request {
    command: Command,
    reply: Option<Reply>,
}

/// Owns the recording machine and applies commands strictly in order.
///
/// Each transition runs on a blocking worker under the machine mutex. The
/// catalogue write for a finalized recording completes before the next
/// command is taken, so a new recording cannot start mid-finalize.
pub struct SessionService {
    machine: Arc<Mutex<RecordingMachine>>,
    catalogue: Arc<dyn Catalogue>,
    requests: mpsc::Receiver<Request>,
}

/// Cloneable command/notification endpoint for a running service
#[derive(Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    notifications: broadcast::Sender<Notification>,
    stats: watch::Receiver<SessionStats>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    /// Spawn the service on the current runtime
    pub fn spawn(machine: RecordingMachine, catalogue: Arc<dyn Catalogue>) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(32);

        let handle = SessionHandle {
            requests: tx,
            notifications: machine.notifier(),
            stats: machine.watch_stats(),
            clock: machine.clock(),
        };

        let service = Self {
            machine: Arc::new(Mutex::new(machine)),
            catalogue,
            requests: rx,
        };

        let task = tokio::spawn(service.run());
        (handle, task)
    }

    async fn run(mut self) {
        info!("Session service started");

        while let Some(request) = self.requests.recv().await {
            let result = self.apply(request.command).await;
            if let Some(reply) = request.reply {
                // Caller may have stopped waiting.
                let _ = reply.send(result);
            }
        }

        // Every handle is gone; don't leave a recording open.
        let state = self.lock_state();
        if matches!(state, SessionState::Recording | SessionState::Paused) {
            info!("Session handles dropped while {}, finalizing", state);
            if let Err(e) = self.apply(Command::Stop).await {
                error!("Failed to finalize on shutdown: {}", e);
            }
        }

        info!("Session service stopped");
    }

    fn lock_state(&self) -> SessionState {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }

    async fn apply(&self, command: Command) -> Result<Transition, SessionError> {
        let machine = Arc::clone(&self.machine);

        let outcome = tokio::task::spawn_blocking(move || {
            let mut machine = machine.lock().unwrap_or_else(PoisonError::into_inner);
            machine.handle(command)
        })
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("Transition for {:?} did not complete: {}", command, e);
                return Err(SessionError::InvalidTransition {
                    state: SessionState::Preparing,
                    event: command_name(command),
                });
            }
        };

        if let Ok(Transition::Finalized(recording)) = &result {
            if let Err(e) = self
                .catalogue
                .add_recording(&recording.name, &recording.output_path, recording.duration_ms())
                .await
            {
                error!(
                    "Failed to catalogue {:?} (file kept): {:#}",
                    recording.output_path, e
                );
            }
        }

        result
    }
}

fn command_name(command: Command) -> &'static str {
    match command {
        Command::Start => "start",
        Command::Pause => "pause",
        Command::Stop => "stop",
    }
}

impl SessionHandle {
    /// Queue a command without waiting for it to run
    pub async fn send(&self, command: Command) {
        let request = Request {
            command,
            reply: None,
        };
        if self.requests.send(request).await.is_err() {
            warn!("Session service is gone, dropping {:?}", command);
        }
    }

    /// Parse and queue a textual command; unknown commands are ignored
    pub async fn send_raw(&self, text: &str) {
        match text.parse::<Command>() {
            Ok(command) => self.send(command).await,
            Err(e) => warn!("Ignoring command: {}", e),
        }
    }

    /// Queue a command and wait for its outcome
    pub async fn dispatch(&self, command: Command) -> Result<Result<Transition, SessionError>> {
        let (tx, rx) = oneshot::channel();
        let request = Request {
            command,
            reply: Some(tx),
        };

        self.requests
            .send(request)
            .await
            .map_err(|_| anyhow!("Session service is gone"))?;

        rx.await
            .map_err(|_| anyhow!("Session service dropped the {:?} request", command))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Latest session snapshot
    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.stats.borrow().state
    }

    /// Recorded time, for reconstructing a running display timer
    pub fn total_duration(&self) -> Duration {
        self.stats.borrow().total_duration_at(self.clock.now())
    }
}
