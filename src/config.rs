use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

use crate::audio::QualityConfig;
use crate::playback::DUCK_VOLUME;
use crate::session::{SessionConfig, StorageLayout};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default)]
    pub quality: QualityOverrides,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub catalogue: CatalogueConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub temp_dir: String,
    pub recordings_dir: String,
    pub file_prefix: String,
    pub high_quality: bool,
    pub keep_segments: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            temp_dir: "~/.cache/sound-recorder".to_string(),
            recordings_dir: "~/Music/SoundRecorder".to_string(),
            file_prefix: "My Recording".to_string(),
            high_quality: false,
            keep_segments: false,
        }
    }
}

/// Per-field overrides on top of the quality preset
#[derive(Debug, Default, Deserialize)]
pub struct QualityOverrides {
    pub sample_rate: Option<u32>,
    pub bit_rate: Option<u32>,
    pub channels: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub duck_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            duck_volume: DUCK_VOLUME,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CatalogueConfig {
    pub path: String,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/sound-recorder/catalogue.json".to_string(),
        }
    }
}

impl Config {
    /// Load from a config file (any format `config` understands) plus
    /// `SOUND_RECORDER__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SOUND_RECORDER").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn quality(&self) -> QualityConfig {
        let preset = if self.recorder.high_quality {
            QualityConfig::high()
        } else {
            QualityConfig::standard()
        };

        QualityConfig {
            sample_rate: self.quality.sample_rate.unwrap_or(preset.sample_rate),
            bit_rate: self.quality.bit_rate.unwrap_or(preset.bit_rate),
            channels: self.quality.channels.unwrap_or(preset.channels),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut layout = StorageLayout::new(
            expand_path(&self.recorder.temp_dir),
            expand_path(&self.recorder.recordings_dir),
        );
        layout.file_prefix = self.recorder.file_prefix.clone();

        SessionConfig {
            layout,
            quality: self.quality(),
            keep_segments: self.recorder.keep_segments,
        }
    }

    pub fn catalogue_path(&self) -> PathBuf {
        expand_path(&self.catalogue.path)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
