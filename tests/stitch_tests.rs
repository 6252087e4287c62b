// Integration tests for segment stitching
//
// Fixture segments are WAV files whose samples all carry one marker value,
// so the order of segments in the output can be read back directly.

mod common;

use anyhow::Result;
use common::*;
use hound::{SampleFormat, WavSpec, WavWriter};
use sound_recorder::{stitch, StitchError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_stitch_preserves_segment_order() -> Result<()> {
    let dir = TempDir::new()?;
    let segments: Vec<_> = (0..5).map(|i| dir.path().join(format!("seg-{i}.wav"))).collect();
    // Write out of order on disk to make sure input order is what counts
    for (i, path) in segments.iter().enumerate().rev() {
        write_marker_wav(path, 16000, 100 + i * 10, i as i16 + 1)?;
    }

    let output = dir.path().join("out.wav");
    let report = stitch(&segments, &output)?;

    assert_eq!(report.segments_used, 5);
    assert!(report.skipped.is_empty());
    assert_eq!(report.frames, 100 + 110 + 120 + 130 + 140);

    let samples = read_samples(&output)?;
    assert_eq!(samples.len() as u64, report.frames);
    assert_eq!(marker_runs(&samples), vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn test_single_segment_is_copied_losslessly() -> Result<()> {
    let dir = TempDir::new()?;
    let segment = dir.path().join("only.wav");

    let spec = WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let original: Vec<i16> = (0..2000).map(|i| ((i * 37) % 65536 - 32768) as i16).collect();
    let mut writer = WavWriter::create(&segment, spec)?;
    for &sample in &original {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    let output = dir.path().join("out.wav");
    let report = stitch(&[&segment], &output)?;

    assert_eq!(report.spec, spec);
    assert_eq!(report.frames, 1000);
    assert_eq!(read_samples(&output)?, original);
    Ok(())
}

#[test]
fn test_float_segments_keep_their_format() -> Result<()> {
    let dir = TempDir::new()?;
    let spec = WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut segments = Vec::new();
    for marker in [0.25f32, -0.5] {
        let path = dir.path().join(format!("seg-{}.wav", segments.len()));
        let mut writer = WavWriter::create(&path, spec)?;
        for _ in 0..48 {
            writer.write_sample(marker)?;
        }
        writer.finalize()?;
        segments.push(path);
    }

    let output = dir.path().join("out.wav");
    stitch(&segments, &output)?;

    let reader = hound::WavReader::open(&output)?;
    assert_eq!(reader.spec(), spec);
    let samples: Vec<f32> = reader.into_samples::<f32>().collect::<Result<_, _>>()?;
    assert_eq!(samples.len(), 96);
    assert_eq!(samples[0], 0.25);
    assert_eq!(samples[95], -0.5);
    Ok(())
}

#[test]
fn test_unreadable_segment_is_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    let good_a = dir.path().join("a.wav");
    let broken = dir.path().join("b.wav");
    let missing = dir.path().join("missing.wav");
    let good_c = dir.path().join("c.wav");
    write_marker_wav(&good_a, 16000, 50, 1)?;
    fs::write(&broken, b"RIFF\x00\x00garbage")?;
    write_marker_wav(&good_c, 16000, 50, 3)?;

    let output = dir.path().join("out.wav");
    let report = stitch(&[&good_a, &broken, &missing, &good_c], &output)?;

    assert_eq!(report.segments_used, 2);
    assert_eq!(report.skipped, vec![broken.clone(), missing]);
    assert_eq!(marker_runs(&read_samples(&output)?), vec![1, 3]);
    // Inputs are never touched
    assert!(broken.exists());
    assert!(good_a.exists());
    Ok(())
}

#[test]
fn test_mismatched_format_is_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    let first = dir.path().join("first.wav");
    let other_rate = dir.path().join("other.wav");
    let last = dir.path().join("last.wav");
    write_marker_wav(&first, 16000, 160, 1)?;
    write_marker_wav(&other_rate, 44100, 441, 2)?;
    write_marker_wav(&last, 16000, 160, 3)?;

    let output = dir.path().join("out.wav");
    let report = stitch(&[&first, &other_rate, &last], &output)?;

    assert_eq!(report.spec.sample_rate, 16000);
    assert_eq!(report.skipped, vec![other_rate]);
    assert_eq!(report.frames, 320);
    assert_eq!(report.media_duration().as_millis(), 20);
    Ok(())
}

#[test]
fn test_no_readable_segments_writes_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let broken = dir.path().join("broken.wav");
    fs::write(&broken, b"nope")?;

    let output = dir.path().join("out.wav");
    let result = stitch(&[&broken], &output);

    assert_eq!(result, Err(StitchError::NoReadableSegments));
    assert!(!output.exists());
    assert_eq!(files_in(dir.path())?, vec![broken]);
    Ok(())
}

#[test]
fn test_empty_segment_list_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("out.wav");
    let segments: [&std::path::Path; 0] = [];

    assert_eq!(stitch(&segments, &output), Err(StitchError::NoReadableSegments));
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_output_directory_is_created() -> Result<()> {
    let dir = TempDir::new()?;
    let segment = dir.path().join("seg.wav");
    write_marker_wav(&segment, 8000, 80, 7)?;

    let output = dir.path().join("nested").join("deeper").join("out.wav");
    stitch(&[&segment], &output)?;

    assert!(output.exists());
    assert!(!output.with_extension("wav.part").exists());
    Ok(())
}

#[test]
fn test_long_segments_stream_exactly() -> Result<()> {
    let dir = TempDir::new()?;
    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    // Two five-second segments with a varying waveform
    let mut expected: Vec<i16> = Vec::new();
    let mut segments = Vec::new();
    for segment in 0..2 {
        let path = dir.path().join(format!("long-{segment}.wav"));
        let mut writer = WavWriter::create(&path, spec)?;
        for i in 0..(5 * 44100) {
            let sample = (((i * 7 + segment * 13) % 65536) as i32 - 32768) as i16;
            writer.write_sample(sample)?;
            expected.push(sample);
        }
        writer.finalize()?;
        segments.push(path);
    }

    let output = dir.path().join("out.wav");
    let report = stitch(&segments, &output)?;

    assert_eq!(report.frames, 10 * 44100);
    assert_eq!(report.media_duration().as_secs(), 10);
    assert_eq!(read_samples(&output)?, expected);
    Ok(())
}

#[test]
fn test_24_bit_segments_keep_their_width() -> Result<()> {
    let dir = TempDir::new()?;
    let spec = WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 24,
        sample_format: SampleFormat::Int,
    };
    let original: Vec<i32> = vec![-8_388_608, -1, 0, 1, 8_388_607, 123_456];

    let segment = dir.path().join("deep.wav");
    let mut writer = WavWriter::create(&segment, spec)?;
    for &sample in &original {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    let output = dir.path().join("out.wav");
    stitch(&[&segment], &output)?;

    let reader = hound::WavReader::open(&output)?;
    assert_eq!(reader.spec(), spec);
    let samples: Vec<i32> = reader.into_samples::<i32>().collect::<Result<_, _>>()?;
    assert_eq!(samples, original);
    Ok(())
}
