use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::CaptureSource;
use crate::error::{CloseError, PrepareError};

/// Encoder quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Target bit rate in bits per second
    pub bit_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl QualityConfig {
    /// Default recording quality: 16kHz mono PCM
    pub fn standard() -> Self {
        Self {
            sample_rate: 16000,
            bit_rate: 256_000,
            channels: 1,
        }
    }

    /// High quality recording: 44.1kHz mono
    pub fn high() -> Self {
        Self {
            sample_rate: 44100,
            bit_rate: 192_000,
            channels: 1,
        }
    }

    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels.max(1),
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Handle to the single open segment of an encoder.
///
/// Not `Clone`: a handle is consumed by exactly one `close`.
#[derive(Debug, PartialEq, Eq)]
pub struct SegmentHandle {
    id: u64,
    path: PathBuf,
}

impl SegmentHandle {
    pub fn new(id: u64, path: PathBuf) -> Self {
        Self { id, path }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Encoder adapter: writes one container file per open/close cycle.
///
/// Both calls may block on I/O.
pub trait SegmentEncoder: Send {
    /// Start writing a new segment at `path`
    fn open(&mut self, path: &Path, quality: &QualityConfig) -> Result<SegmentHandle, PrepareError>;

    /// Finalize the segment and return its encoded duration
    fn close(&mut self, handle: SegmentHandle) -> Result<Duration, CloseError>;
}

impl<E: SegmentEncoder + ?Sized> SegmentEncoder for Box<E> {
    fn open(&mut self, path: &Path, quality: &QualityConfig) -> Result<SegmentHandle, PrepareError> {
        (**self).open(path, quality)
    }

    fn close(&mut self, handle: SegmentHandle) -> Result<Duration, CloseError> {
        (**self).close(handle)
    }
}

/// Segment currently being written
struct ActiveSegment {
    id: u64,
    path: PathBuf,
    sample_rate: u32,
    writer: JoinHandle<Result<u64, hound::Error>>,
}

/// PCM WAV encoder fed by a capture source
///
/// Each open segment gets its own writer thread which drains the capture
/// channel into a `hound::WavWriter` until the source stops.
pub struct WavSegmentEncoder {
    source: Box<dyn CaptureSource>,
    active: Option<ActiveSegment>,
    next_id: u64,
}

impl WavSegmentEncoder {
    pub fn new(source: Box<dyn CaptureSource>) -> Self {
        Self {
            source,
            active: None,
            next_id: 0,
        }
    }

    /// Whether a segment is currently open
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }
}

fn prepare_error(err: hound::Error) -> PrepareError {
    match err {
        hound::Error::IoError(e) => PrepareError::Io(e.to_string()),
        other => PrepareError::Unknown(other.to_string()),
    }
}

impl SegmentEncoder for WavSegmentEncoder {
    fn open(&mut self, path: &Path, quality: &QualityConfig) -> Result<SegmentHandle, PrepareError> {
        if self.active.is_some() {
            return Err(PrepareError::DeviceBusy);
        }

        let spec = quality.wav_spec();
        let mut writer = hound::WavWriter::create(path, spec).map_err(prepare_error)?;

        let mut frames_rx = match self.source.start(quality) {
            Ok(rx) => rx,
            Err(e) => {
                drop(writer);
                if let Err(rm) = fs::remove_file(path) {
                    warn!("Failed to remove unused segment {:?}: {}", path, rm);
                }
                return Err(e);
            }
        };

        let channels = u64::from(spec.channels);
        let spawned = thread::Builder::new()
            .name("segment-writer".to_string())
            .spawn(move || {
                let mut samples_written: u64 = 0;
                while let Some(frame) = frames_rx.blocking_recv() {
                    for &sample in &frame.samples {
                        writer.write_sample(sample)?;
                    }
                    samples_written += frame.samples.len() as u64;
                }
                writer.finalize()?;
                Ok(samples_written / channels)
            });

        let writer = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.source.stop();
                return Err(PrepareError::Io(e.to_string()));
            }
        };

        let id = self.next_id;
        self.next_id += 1;
        self.active = Some(ActiveSegment {
            id,
            path: path.to_path_buf(),
            sample_rate: spec.sample_rate,
            writer,
        });

        info!(
            "Segment {} open: {:?} ({}Hz, {}ch, source: {})",
            id,
            path,
            spec.sample_rate,
            spec.channels,
            self.source.name()
        );

        Ok(SegmentHandle::new(id, path.to_path_buf()))
    }

    fn close(&mut self, handle: SegmentHandle) -> Result<Duration, CloseError> {
        let active = match self.active.take() {
            Some(active) if active.id == handle.id => active,
            other => {
                self.active = other;
                return Err(CloseError(format!("segment {} is not open", handle.id)));
            }
        };

        self.source.stop();

        let frames = active
            .writer
            .join()
            .map_err(|_| CloseError("segment writer panicked".to_string()))?
            .map_err(|e| CloseError(e.to_string()))?;

        let duration = Duration::from_secs_f64(frames as f64 / f64::from(active.sample_rate.max(1)));

        info!(
            "Segment {} closed: {:?} ({} frames, {:.2}s)",
            active.id,
            active.path,
            frames,
            duration.as_secs_f64()
        );

        Ok(duration)
    }
}

impl Drop for WavSegmentEncoder {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            self.source.stop();
            match active.writer.join() {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Failed to finalize segment {:?} on drop: {}", active.path, e),
                Err(_) => warn!("Segment writer for {:?} panicked", active.path),
            }
        }
    }
}
