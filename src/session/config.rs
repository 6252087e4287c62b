use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::audio::QualityConfig;

/// Where segment and output files live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    /// Private scope for in-progress segments
    pub temp_dir: PathBuf,

    /// Public scope for finalized recordings
    pub recordings_dir: PathBuf,

    /// Base name for output files (e.g., "My Recording" -> "My Recording_3.wav")
    pub file_prefix: String,
}

impl StorageLayout {
    pub fn new(temp_dir: PathBuf, recordings_dir: PathBuf) -> Self {
        Self {
            temp_dir,
            recordings_dir,
            file_prefix: "My Recording".to_string(),
        }
    }

    /// Create the temp and recordings directories
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.temp_dir)?;
        fs::create_dir_all(&self.recordings_dir)
    }

    /// Path of segment `index` for a session
    pub fn segment_path(&self, session_id: &Uuid, index: usize) -> PathBuf {
        self.temp_dir.join(format!(
            "{}-{}-seg-{:03}.wav",
            self.file_prefix, session_id, index
        ))
    }

    /// First unused output path, counting up from 1
    pub fn next_output_path(&self) -> PathBuf {
        let mut count = 0usize;
        loop {
            count += 1;
            let candidate = self.output_path(count);
            if !Self::is_taken(&candidate) {
                return candidate;
            }
        }
    }

    pub fn output_path(&self, number: usize) -> PathBuf {
        self.recordings_dir
            .join(format!("{}_{}.wav", self.file_prefix, number))
    }

    fn is_taken(path: &Path) -> bool {
        path.exists() && !path.is_dir()
    }
}

/// Configuration for a recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub layout: StorageLayout,

    /// Encoder settings used for every segment
    pub quality: QualityConfig,

    /// Keep temp segments after a successful finalize
    pub keep_segments: bool,
}

impl SessionConfig {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            quality: QualityConfig::standard(),
            keep_segments: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let base = std::env::temp_dir().join("sound-recorder");
        Self::new(StorageLayout::new(base.join("segments"), base.join("recordings")))
    }
}
