//! Persistent retry counters keyed by (spec, stage).
//!
//! Counters live in `<state_dir>/retry.json` so that a killed and restarted
//! process continues with the budget it had left. The file is rewritten
//! atomically (temp file + rename) on every mutation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::stage::Stage;

/// Storage for retry counters.
///
/// Injected into `StageRunner` so tests and alternative backends can swap it.
pub trait RetryStore: Send + Sync {
    /// Current count, 0 if never recorded.
    fn get(&self, spec: &str, stage: Stage) -> Result<u32>;

    /// Increment and return the new count.
    fn increment(&self, spec: &str, stage: Stage) -> Result<u32>;

    /// Reset the count to 0.
    fn reset(&self, spec: &str, stage: Stage) -> Result<()>;
}

/// One persisted counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryEntry {
    pub count: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RetryFile {
    #[serde(default)]
    retries: BTreeMap<String, RetryEntry>,
}

/// File-backed `RetryStore`.
pub struct FileRetryStore {
    path: PathBuf,
}

impl FileRetryStore {
    pub const FILE_NAME: &'static str = "retry.json";

    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All non-zero counters, keyed `spec:stage`.
    pub fn entries(&self) -> Result<BTreeMap<String, RetryEntry>> {
        Ok(self.load()?.retries)
    }

    /// Reset every counter recorded for a spec. Returns how many were removed.
    pub fn reset_spec(&self, spec: &str) -> Result<usize> {
        let mut file = self.load()?;
        let prefix = format!("{}:", spec);
        let before = file.retries.len();
        file.retries.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - file.retries.len();
        if removed > 0 {
            self.save(&file)?;
        }
        Ok(removed)
    }

    fn key(spec: &str, stage: Stage) -> String {
        format!("{}:{}", spec, stage)
    }

    fn load(&self) -> Result<RetryFile> {
        if !self.path.exists() {
            return Ok(RetryFile::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read retry state: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(RetryFile::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse retry state: {}", self.path.display()))
    }

    fn save(&self, file: &RetryFile) -> Result<()> {
        let parent = self
            .path
            .parent()
            .context("Retry state path has no parent directory")?;
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create state directory: {}", parent.display())
        })?;

        let mut buf =
            serde_json::to_string_pretty(file).context("Failed to serialize retry state")?;
        buf.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, buf)
            .with_context(|| format!("Failed to write retry state: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace retry state: {}", self.path.display()))?;
        Ok(())
    }
}

impl RetryStore for FileRetryStore {
    fn get(&self, spec: &str, stage: Stage) -> Result<u32> {
        let file = self.load()?;
        Ok(file
            .retries
            .get(&Self::key(spec, stage))
            .map_or(0, |e| e.count))
    }

    fn increment(&self, spec: &str, stage: Stage) -> Result<u32> {
        let mut file = self.load()?;
        let entry = file
            .retries
            .entry(Self::key(spec, stage))
            .or_insert(RetryEntry {
                count: 0,
                updated_at: Utc::now(),
            });
        entry.count = entry.count.saturating_add(1);
        entry.updated_at = Utc::now();
        let count = entry.count;
        self.save(&file)?;
        debug!(spec, %stage, count, "retry counter incremented");
        Ok(count)
    }

    fn reset(&self, spec: &str, stage: Stage) -> Result<()> {
        let mut file = self.load()?;
        if file.retries.remove(&Self::key(spec, stage)).is_some() {
            self.save(&file)?;
            debug!(spec, %stage, "retry counter reset");
        }
        Ok(())
    }
}
