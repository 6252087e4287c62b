use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

/// One finalized recording known to the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingEntry {
    pub name: String,
    pub path: PathBuf,
    pub duration_ms: u64,
    pub added_at: DateTime<Utc>,
}

/// Store of past recordings. Assigns no identity back to the caller.
#[async_trait::async_trait]
pub trait Catalogue: Send + Sync {
    /// Record a finalized output file
    async fn add_recording(&self, name: &str, path: &Path, duration_ms: u64) -> Result<()>;

    /// Number of recordings stored
    async fn count(&self) -> Result<usize>;

    /// All recordings, oldest first
    async fn entries(&self) -> Result<Vec<RecordingEntry>>;
}

/// Catalogue persisted as a JSON array on disk
pub struct JsonCatalogue {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonCatalogue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<RecordingEntry>> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to check catalogue {:?}", self.path))?;
        if !exists {
            return Ok(Vec::new());
        }

        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read catalogue {:?}", self.path))?;

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).with_context(|| format!("Corrupt catalogue {:?}", self.path))
    }

    async fn save(&self, entries: &[RecordingEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create catalogue directory")?;
        }

        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write catalogue {:?}", tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace catalogue {:?}", self.path))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Catalogue for JsonCatalogue {
    async fn add_recording(&self, name: &str, path: &Path, duration_ms: u64) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        entries.push(RecordingEntry {
            name: name.to_string(),
            path: path.to_path_buf(),
            duration_ms,
            added_at: Utc::now(),
        });
        self.save(&entries).await?;

        info!("Catalogued {} ({}ms) -> {:?}", name, duration_ms, path);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.len())
    }

    async fn entries(&self) -> Result<Vec<RecordingEntry>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}

/// In-memory catalogue
#[derive(Default)]
pub struct MemoryCatalogue {
    entries: Mutex<Vec<RecordingEntry>>,
}

impl MemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Catalogue for MemoryCatalogue {
    async fn add_recording(&self, name: &str, path: &Path, duration_ms: u64) -> Result<()> {
        self.entries.lock().await.push(RecordingEntry {
            name: name.to_string(),
            path: path.to_path_buf(),
            duration_ms,
            added_at: Utc::now(),
        });
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.lock().await.len())
    }

    async fn entries(&self) -> Result<Vec<RecordingEntry>> {
        Ok(self.entries.lock().await.clone())
    }
}
