use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::encoder::QualityConfig;
use crate::error::PrepareError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Number of sample frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }
}

/// Audio capture source feeding a segment encoder
///
/// The encoder owns exactly one source and starts/stops it around every
/// segment. Frames are delivered on a bounded channel; the source closes
/// the channel when it stops.
pub trait CaptureSource: Send {
    /// Start capturing with the given quality settings
    fn start(&mut self, quality: &QualityConfig) -> Result<mpsc::Receiver<AudioFrame>, PrepareError>;

    /// Stop capturing and close the frame channel
    fn stop(&mut self);

    /// Check if the source is currently capturing
    fn is_capturing(&self) -> bool;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Real-time generator of marker frames.
///
/// Every sample of a frame carries the frame's running index (modulo
/// `i16::MAX`), and the index keeps counting across start/stop cycles, so
/// concatenated segments can be checked for ordering.
pub struct SyntheticSource {
    frame_duration: Duration,
    next_index: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SyntheticSource {
    pub fn new(frame_duration: Duration) -> Self {
        Self {
            frame_duration,
            next_index: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Number of frames generated so far
    pub fn frames_generated(&self) -> u64 {
        self.next_index.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(20))
    }
}

impl CaptureSource for SyntheticSource {
    fn start(&mut self, quality: &QualityConfig) -> Result<mpsc::Receiver<AudioFrame>, PrepareError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(PrepareError::DeviceBusy);
        }

        let (tx, rx) = mpsc::channel(64);
        let frame_duration = self.frame_duration;
        let sample_rate = quality.sample_rate;
        let channels = quality.channels.max(1);
        let frames_per_buffer =
            ((u128::from(sample_rate) * frame_duration.as_millis()) / 1000).max(1) as usize;
        let next_index = Arc::clone(&self.next_index);
        let running = Arc::clone(&self.running);

        running.store(true, Ordering::SeqCst);

        let worker = thread::Builder::new()
            .name("synthetic-capture".to_string())
            .spawn(move || {
                let started = Instant::now();
                while running.load(Ordering::SeqCst) {
                    let index = next_index.fetch_add(1, Ordering::SeqCst);
                    let marker = (index % i16::MAX as u64) as i16;
                    let frame = AudioFrame {
                        samples: vec![marker; frames_per_buffer * usize::from(channels)],
                        sample_rate,
                        channels,
                        timestamp_ms: started.elapsed().as_millis() as u64,
                    };

                    if tx.blocking_send(frame).is_err() {
                        debug!("Frame receiver dropped, stopping synthetic capture");
                        break;
                    }

                    thread::sleep(frame_duration);
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                PrepareError::Io(e.to_string())
            })?;

        self.worker = Some(worker);
        Ok(rx)
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Synthetic capture thread panicked");
            }
        }
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop();
    }
}
