// Shared fixtures for integration tests
//
// FakeEncoder writes real WAV segments (so the stitcher has something to
// read) and can be told to fail the next open or close, or to leave a
// corrupt file behind.

#![allow(dead_code)]

use anyhow::Result;
use hound::{WavReader, WavSpec, WavWriter};
use sound_recorder::{
    CloseError, ManualClock, Notification, PrepareError, QualityConfig, RecordingMachine,
    SegmentEncoder, SegmentHandle, SessionConfig, StorageLayout,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Frames written into every fake segment
pub const FRAMES_PER_SEGMENT: usize = 160;

#[derive(Debug, Default)]
pub struct FakeControl {
    pub fail_next_open: Option<PrepareError>,
    pub fail_next_close: bool,
    pub corrupt_next: bool,
    pub opened: Vec<PathBuf>,
    pub closed: usize,
}

pub type Control = Arc<Mutex<FakeControl>>;

struct OpenFake {
    id: u64,
    writer: Option<WavWriter<BufWriter<File>>>,
    rate: u32,
}

/// Encoder that writes `FRAMES_PER_SEGMENT` frames whose samples all equal
/// the segment's open order (0, 1, 2, ...)
pub struct FakeEncoder {
    control: Control,
    open: Option<OpenFake>,
    next_id: u64,
}

impl FakeEncoder {
    pub fn new() -> (Self, Control) {
        let control = Arc::new(Mutex::new(FakeControl::default()));
        let encoder = Self {
            control: Arc::clone(&control),
            open: None,
            next_id: 0,
        };
        (encoder, control)
    }
}

impl SegmentEncoder for FakeEncoder {
    fn open(&mut self, path: &Path, quality: &QualityConfig) -> Result<SegmentHandle, PrepareError> {
        let mut control = self.control.lock().unwrap();
        if self.open.is_some() {
            return Err(PrepareError::DeviceBusy);
        }
        if let Some(err) = control.fail_next_open.take() {
            return Err(err);
        }

        let marker = control.opened.len() as i16;
        let writer = if std::mem::take(&mut control.corrupt_next) {
            fs::write(path, b"not a wav file")?;
            None
        } else {
            let mut writer = WavWriter::create(path, quality.wav_spec())
                .map_err(|e| PrepareError::Unknown(e.to_string()))?;
            for _ in 0..FRAMES_PER_SEGMENT * usize::from(quality.channels) {
                writer
                    .write_sample(marker)
                    .map_err(|e| PrepareError::Unknown(e.to_string()))?;
            }
            Some(writer)
        };

        control.opened.push(path.to_path_buf());
        let id = self.next_id;
        self.next_id += 1;
        self.open = Some(OpenFake {
            id,
            writer,
            rate: quality.sample_rate,
        });
        Ok(SegmentHandle::new(id, path.to_path_buf()))
    }

    fn close(&mut self, handle: SegmentHandle) -> Result<Duration, CloseError> {
        let mut control = self.control.lock().unwrap();
        let open = match self.open.take() {
            Some(open) if open.id == handle.id() => open,
            other => {
                self.open = other;
                return Err(CloseError("not open".to_string()));
            }
        };

        if let Some(writer) = open.writer {
            writer.finalize().map_err(|e| CloseError(e.to_string()))?;
        }
        control.closed += 1;

        if std::mem::take(&mut control.fail_next_close) {
            return Err(CloseError("encoder stopped abnormally".to_string()));
        }

        Ok(Duration::from_secs_f64(
            FRAMES_PER_SEGMENT as f64 / f64::from(open.rate),
        ))
    }
}

pub struct TestRig {
    pub machine: RecordingMachine,
    pub clock: ManualClock,
    pub control: Control,
    // Dropped last so an open segment can still be closed on drop
    pub dir: TempDir,
}

impl TestRig {
    pub fn new() -> Result<Self> {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut SessionConfig)) -> Result<Self> {
        let dir = TempDir::new()?;
        let mut config = SessionConfig::new(StorageLayout::new(
            dir.path().join("segments"),
            dir.path().join("recordings"),
        ));
        adjust(&mut config);

        let (encoder, control) = FakeEncoder::new();
        let clock = ManualClock::new();
        let machine = RecordingMachine::new(config, Box::new(encoder), Arc::new(clock.clone()));

        Ok(Self {
            machine,
            clock,
            control,
            dir,
        })
    }

    pub fn recordings_dir(&self) -> PathBuf {
        self.dir.path().join("recordings")
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.dir.path().join("segments")
    }

    pub fn advance_ms(&self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
    }
}

/// Everything currently queued on a notification receiver
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

pub fn error_count(notifications: &[Notification]) -> usize {
    notifications
        .iter()
        .filter(|n| matches!(n, Notification::Error { .. }))
        .count()
}

pub fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    files.sort();
    Ok(files)
}

/// Write a 16-bit mono WAV whose samples are all `marker`
pub fn write_marker_wav(path: &Path, sample_rate: u32, frames: usize, marker: i16) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..frames {
        writer.write_sample(marker)?;
    }
    writer.finalize()?;
    Ok(())
}

pub fn read_samples(path: &Path) -> Result<Vec<i16>> {
    let reader = WavReader::open(path)?;
    Ok(reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?)
}

/// Collapse runs of equal samples: [0,0,1,1,1,2] -> [0,1,2]
pub fn marker_runs(samples: &[i16]) -> Vec<i16> {
    let mut runs: Vec<i16> = Vec::new();
    for &sample in samples {
        if runs.last() != Some(&sample) {
            runs.push(sample);
        }
    }
    runs
}
