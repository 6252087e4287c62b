use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::info;

/// Container-level description of a media file
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Sample frames in the default track
    pub frames: u64,
    /// Short codec name reported by the demuxer
    pub codec: String,
}

impl AudioFile {
    /// Probe any supported container (WAV, M4A, MP3, FLAC, OGG)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Probing audio file: {}", path.display());

        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .context("Unsupported or corrupt media container")?;

        let format = probed.format;
        let track = format
            .default_track()
            .context("No audio track found")?;
        let params = &track.codec_params;

        let sample_rate = params.sample_rate.context("Track has no sample rate")?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(1);
        let frames = params.n_frames.unwrap_or(0);
        let codec = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|d| d.short_name.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let duration_seconds = frames as f64 / f64::from(sample_rate);

        info!(
            "Audio file probed: {:.2}s, {}Hz, {} channels, {} frames ({})",
            duration_seconds, sample_rate, channels, frames, codec
        );

        Ok(Self {
            path: path.to_path_buf(),
            duration_seconds,
            sample_rate,
            channels,
            frames,
            codec,
        })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.duration_seconds * 1000.0).round() as u64
    }
}
