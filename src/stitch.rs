//! Lossless segment stitching
//!
//! Each segment container is parsed in full before it is used, then its PCM
//! samples are streamed into one output track in capture order, and a single
//! WAV container with one header is written for the merged timeline. Samples
//! are copied at their stored bit depth, so nothing is re-encoded, and memory
//! use does not grow with segment length.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::StitchError;

/// Summary of a successful stitch
#[derive(Debug, Clone, PartialEq)]
pub struct StitchReport {
    pub output_path: PathBuf,
    pub spec: WavSpec,
    /// Sample frames in the merged track
    pub frames: u64,
    pub segments_used: usize,
    /// Segments that could not be parsed or did not match the track format
    pub skipped: Vec<PathBuf>,
}

impl StitchReport {
    pub fn media_duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / f64::from(self.spec.sample_rate.max(1)))
    }
}

/// Parse every sample of a segment without keeping any; any error rejects
/// the segment as a unit. Returns the format and the sample count.
fn validate_segment(path: &Path) -> Result<(WavSpec, u64), hound::Error> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let mut count: u64 = 0;
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => {
            for sample in reader.samples::<f32>() {
                sample?;
                count += 1;
            }
        }
        (SampleFormat::Int, bits) if bits <= 16 => {
            for sample in reader.samples::<i16>() {
                sample?;
                count += 1;
            }
        }
        (SampleFormat::Int, _) => {
            for sample in reader.samples::<i32>() {
                sample?;
                count += 1;
            }
        }
    }

    Ok((spec, count))
}

/// Stream a validated segment into the output at its stored width
fn append_segment(writer: &mut WavWriter<BufWriter<File>>, path: &Path) -> Result<u64, hound::Error> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let mut count: u64 = 0;
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => {
            for sample in reader.samples::<f32>() {
                writer.write_sample(sample?)?;
                count += 1;
            }
        }
        (SampleFormat::Int, bits) if bits <= 16 => {
            for sample in reader.samples::<i16>() {
                writer.write_sample(sample?)?;
                count += 1;
            }
        }
        (SampleFormat::Int, _) => {
            for sample in reader.samples::<i32>() {
                writer.write_sample(sample?)?;
                count += 1;
            }
        }
    }

    Ok(count)
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

fn discard(partial: &Path) {
    if let Err(e) = fs::remove_file(partial) {
        warn!("Failed to remove partial output {:?}: {}", partial, e);
    }
}

fn write_error(partial: &Path, err: impl std::fmt::Display) -> StitchError {
    error!("Stitch write failed for {:?}: {}", partial, err);
    discard(partial);
    StitchError::Write(err.to_string())
}

/// Concatenate `segments` (in order) into a single container at `output`.
///
/// The first readable segment fixes the track format; later segments with a
/// different format are skipped, as are segments that fail to parse. No
/// output file exists unless the call succeeds, and input segments are
/// never modified or deleted.
pub fn stitch<P: AsRef<Path>>(segments: &[P], output: &Path) -> Result<StitchReport, StitchError> {
    info!("Stitching {} segments into {:?}", segments.len(), output);

    let partial = partial_path(output);
    let mut writer: Option<(WavWriter<BufWriter<File>>, WavSpec)> = None;
    let mut frames: u64 = 0;
    let mut used = 0usize;
    let mut skipped = Vec::new();

    for segment in segments {
        let segment = segment.as_ref();

        let (spec, samples) = match validate_segment(segment) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping unreadable segment {:?}: {}", segment, e);
                skipped.push(segment.to_path_buf());
                continue;
            }
        };

        if let Some((_, track_spec)) = &writer {
            if spec != *track_spec {
                warn!(
                    "Skipping segment {:?}: format {:?} does not match track {:?}",
                    segment, spec, track_spec
                );
                skipped.push(segment.to_path_buf());
                continue;
            }
        }

        if writer.is_none() {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent).map_err(|e| StitchError::Write(e.to_string()))?;
            }
            let created = WavWriter::create(&partial, spec).map_err(|e| write_error(&partial, e))?;
            writer = Some((created, spec));
        }

        if let Some((out, _)) = writer.as_mut() {
            match append_segment(out, segment) {
                Ok(written) if written == samples => {}
                Ok(written) => {
                    drop(writer.take());
                    return Err(write_error(
                        &partial,
                        format!(
                            "segment {:?} changed while stitching ({} of {} samples)",
                            segment, written, samples
                        ),
                    ));
                }
                Err(e) => {
                    drop(writer.take());
                    return Err(write_error(&partial, e));
                }
            }
        }

        frames += samples / u64::from(spec.channels.max(1));
        used += 1;
    }

    let Some((out, spec)) = writer else {
        error!(
            "No readable segments among {} inputs; no output written",
            segments.len()
        );
        return Err(StitchError::NoReadableSegments);
    };

    out.finalize().map_err(|e| write_error(&partial, e))?;
    fs::rename(&partial, output).map_err(|e| write_error(&partial, e))?;

    let report = StitchReport {
        output_path: output.to_path_buf(),
        spec,
        frames,
        segments_used: used,
        skipped,
    };

    info!(
        "Stitched {} segments ({} skipped) into {:?}: {:.2}s",
        report.segments_used,
        report.skipped.len(),
        output,
        report.media_duration().as_secs_f64()
    );

    Ok(report)
}
