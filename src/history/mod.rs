//! Evaluation history
//!
//! Suite runs are appended to a JSON array on disk, keeping only the newest
//! `cap` entries. Entries are never edited after they are written.

mod compare;

pub use compare::{
    analyze_trends, compare_summaries, comparison_report, history_report, Change, Comparison,
    MetricComparison, Trend, TrendAnalysis,
};

use crate::config::StorageConfig;
use crate::error::{FolioError, Result};
use crate::evaluation::RunSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Revision tag used when the environment names none
pub const UNKNOWN_REVISION: &str = "unknown";

/// One recorded suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub git_commit: String,
    pub branch: String,
    pub summary: RunSummary,
}

impl HistoryEntry {
    /// Tag a summary with the revision from `GIT_COMMIT` / `GIT_BRANCH`
    pub fn new(summary: RunSummary) -> Self {
        let env_or_unknown = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_REVISION.to_string())
        };
        Self::with_revision(summary, env_or_unknown("GIT_COMMIT"), env_or_unknown("GIT_BRANCH"))
    }

    pub fn with_revision(
        summary: RunSummary,
        git_commit: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            git_commit: git_commit.into(),
            branch: branch.into(),
            summary,
        }
    }

    /// First eight characters of the commit
    pub fn short_commit(&self) -> &str {
        match self.git_commit.char_indices().nth(8) {
            Some((end, _)) => &self.git_commit[..end],
            None => &self.git_commit,
        }
    }
}

/// File-backed, bounded history
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    cap: usize,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap: cap.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(storage.history_path(), storage.history_cap)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, oldest first. A missing or unreadable file is an empty
    /// history.
    pub fn load(&self) -> Vec<HistoryEntry> {
        if !self.path.exists() {
            return Vec::new();
        }
        match self.read() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Ignoring unreadable history at {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn read(&self) -> Result<Vec<HistoryEntry>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| FolioError::Io {
            source: e,
            context: format!("Failed to read history file: {}", self.path.display()),
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| FolioError::Json {
            source: e,
            context: "Failed to deserialize history".to_string(),
        })
    }

    /// Append an entry, dropping the oldest ones beyond the cap.
    /// Returns the history length after the write.
    pub fn append(&self, entry: HistoryEntry) -> Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| FolioError::Config("History lock poisoned".to_string()))?;

        let mut entries = self.load();
        entries.push(entry);
        if entries.len() > self.cap {
            let excess = entries.len() - self.cap;
            entries.drain(..excess);
        }
        self.write(&entries)?;

        tracing::debug!(entries = entries.len(), path = %self.path.display(), "history saved");
        Ok(entries.len())
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| FolioError::Io {
                    source: e,
                    context: format!("Failed to create history directory: {}", parent.display()),
                })?;
            }
        }

        let content = serde_json::to_string_pretty(entries).map_err(|e| FolioError::Json {
            source: e,
            context: "Failed to serialize history".to_string(),
        })?;

        // Write then rename so readers never see a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| FolioError::Io {
            source: e,
            context: format!("Failed to write history file: {}", tmp.display()),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| FolioError::Io {
            source: e,
            context: format!("Failed to replace history file: {}", self.path.display()),
        })?;
        Ok(())
    }

    /// Entry at `index` (0 = oldest)
    pub fn get(&self, index: usize) -> Result<HistoryEntry> {
        let mut entries = self.load();
        let len = entries.len();
        if index >= len {
            return Err(FolioError::HistoryIndex { index, len });
        }
        Ok(entries.swap_remove(index))
    }

    /// Compare two entries by index
    pub fn compare(&self, old_index: usize, new_index: usize) -> Result<Comparison> {
        let entries = self.load();
        let len = entries.len();
        let old = entries
            .get(old_index)
            .ok_or(FolioError::HistoryIndex { index: old_index, len })?;
        let new = entries
            .get(new_index)
            .ok_or(FolioError::HistoryIndex { index: new_index, len })?;
        Ok(Comparison::between(old_index, old, new_index, new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn summary(pass_rate: f64) -> RunSummary {
        let mut summary = RunSummary::from_results(Vec::new(), Duration::ZERO);
        summary.pass_rate = pass_rate;
        summary
    }

    fn store(dir: &TempDir, cap: usize) -> HistoryStore {
        HistoryStore::new(dir.path().join("nested").join("history.json"), cap)
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir, 50).load().is_empty());
    }

    #[test]
    fn corrupt_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = HistoryStore::new(&path, 50);
        assert!(store.load().is_empty());

        // and appending recovers the file
        assert_eq!(store.append(HistoryEntry::new(summary(10.0))).unwrap(), 1);
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn append_trims_oldest_beyond_cap() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 3);
        for i in 0..5 {
            store
                .append(HistoryEntry::with_revision(summary(i as f64), format!("c{i}"), "main"))
                .unwrap();
        }
        let entries = store.load();
        assert_eq!(entries.len(), 3);
        let commits: Vec<&str> = entries.iter().map(|e| e.git_commit.as_str()).collect();
        assert_eq!(commits, vec!["c2", "c3", "c4"]);
    }

    #[test]
    fn get_reports_out_of_range() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 50);
        store.append(HistoryEntry::new(summary(50.0))).unwrap();
        assert!(store.get(0).is_ok());
        assert!(matches!(
            store.get(3),
            Err(FolioError::HistoryIndex { index: 3, len: 1 })
        ));
    }

    #[test]
    fn short_commit_truncates() {
        let entry = HistoryEntry::with_revision(summary(0.0), "0123456789abcdef", "main");
        assert_eq!(entry.short_commit(), "01234567");
        let entry = HistoryEntry::with_revision(summary(0.0), "abc", "main");
        assert_eq!(entry.short_commit(), "abc");
    }
}
