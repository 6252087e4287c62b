// Integration tests for the WAV segment encoder and synthetic capture
//
// These run real capture and writer threads, so durations are only checked
// loosely.

mod common;

use anyhow::Result;
use common::*;
use sound_recorder::{
    AudioFile, CaptureSource, PrepareError, QualityConfig, SegmentEncoder, SegmentHandle,
    SyntheticSource, WavSegmentEncoder,
};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn encoder() -> WavSegmentEncoder {
    WavSegmentEncoder::new(Box::new(SyntheticSource::new(Duration::from_millis(10))))
}

#[test]
fn test_segment_is_written_and_closed() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("seg-000.wav");
    let quality = QualityConfig::standard();
    let mut encoder = encoder();

    let handle = encoder.open(&path, &quality)?;
    assert!(encoder.is_open());
    thread::sleep(Duration::from_millis(100));
    let duration = encoder.close(handle)?;

    assert!(!encoder.is_open());
    assert!(duration > Duration::ZERO);

    let reader = hound::WavReader::open(&path)?;
    assert_eq!(reader.spec(), quality.wav_spec());
    let frames = u64::from(reader.duration());
    assert_eq!(
        duration,
        Duration::from_secs_f64(frames as f64 / f64::from(quality.sample_rate))
    );

    // Markers never go backwards within a segment
    let samples = read_samples(&path)?;
    assert!(samples.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

#[test]
fn test_second_open_reports_device_busy() -> Result<()> {
    let dir = TempDir::new()?;
    let mut encoder = encoder();
    let quality = QualityConfig::standard();

    let handle = encoder.open(&dir.path().join("a.wav"), &quality)?;
    let second = encoder.open(&dir.path().join("b.wav"), &quality);

    assert_eq!(second.err(), Some(PrepareError::DeviceBusy));
    assert!(!dir.path().join("b.wav").exists());

    encoder.close(handle)?;
    Ok(())
}

#[test]
fn test_close_with_stale_handle_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("a.wav");
    let mut encoder = encoder();

    let handle = encoder.open(&path, &QualityConfig::standard())?;
    let stale = SegmentHandle::new(handle.id() + 1, path.clone());

    assert!(encoder.close(stale).is_err());
    assert!(encoder.is_open());

    encoder.close(handle)?;
    Ok(())
}

#[test]
fn test_markers_continue_across_segments() -> Result<()> {
    let dir = TempDir::new()?;
    let first = dir.path().join("seg-000.wav");
    let second = dir.path().join("seg-001.wav");
    let quality = QualityConfig::standard();
    let mut encoder = encoder();

    let handle = encoder.open(&first, &quality)?;
    thread::sleep(Duration::from_millis(50));
    encoder.close(handle)?;

    let handle = encoder.open(&second, &quality)?;
    thread::sleep(Duration::from_millis(50));
    encoder.close(handle)?;

    let first_samples = read_samples(&first)?;
    let second_samples = read_samples(&second)?;
    assert!(!first_samples.is_empty());
    assert!(!second_samples.is_empty());
    assert!(first_samples.last() < second_samples.first());
    Ok(())
}

#[test]
fn test_written_segment_can_be_probed() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("probe.wav");
    let quality = QualityConfig::high();
    let mut encoder = encoder();

    let handle = encoder.open(&path, &quality)?;
    thread::sleep(Duration::from_millis(60));
    let duration = encoder.close(handle)?;

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.sample_rate, 44100);
    assert_eq!(audio.channels, 1);
    let drift = audio.duration_ms().abs_diff(duration.as_millis() as u64);
    assert!(drift <= 1, "probed and encoded durations differ by {drift}ms");
    Ok(())
}

#[test]
fn test_synthetic_source_rejects_double_start() -> Result<()> {
    let mut source = SyntheticSource::new(Duration::from_millis(5));
    let quality = QualityConfig::standard();

    let mut rx = source.start(&quality)?;
    assert!(source.is_capturing());
    assert_eq!(source.start(&quality).err(), Some(PrepareError::DeviceBusy));

    let frame = rx
        .blocking_recv()
        .ok_or_else(|| anyhow::anyhow!("no frame"))?;
    assert_eq!(frame.sample_rate, 16000);
    assert_eq!(frame.frame_count(), 80);

    drop(rx);
    source.stop();
    assert!(!source.is_capturing());
    assert!(source.frames_generated() >= 1);
    Ok(())
}
