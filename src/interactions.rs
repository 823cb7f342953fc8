//! Append-only interaction log
//!
//! One JSON object per line: every search and every feedback event.

use crate::error::{FolioError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A logged search or feedback event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_ids: Option<Vec<String>>,
    /// Document the user chose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

impl Interaction {
    pub fn search(query: impl Into<String>, result_ids: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            query: Some(query.into()),
            result_ids: Some(result_ids),
            doc_id: None,
        }
    }

    pub fn feedback(query: impl Into<String>, doc_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            query: Some(query.into()),
            result_ids: None,
            doc_id: Some(doc_id.into()),
        }
    }
}

/// Newline-delimited JSON log; appends are serialized through a lock
#[derive(Debug)]
pub struct InteractionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl InteractionLog {
    /// Open (creating if needed) the log at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| FolioError::Io {
                    source: e,
                    context: format!("Failed to create log directory: {}", parent.display()),
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| FolioError::Io {
                source: e,
                context: format!("Failed to open interaction log: {}", path.display()),
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, interaction: &Interaction) -> Result<()> {
        let mut line = serde_json::to_string(interaction).map_err(|e| FolioError::Json {
            source: e,
            context: "Failed to serialize interaction".to_string(),
        })?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| FolioError::Config("Interaction log lock poisoned".to_string()))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| FolioError::Io {
                source: e,
                context: format!("Failed to append to {}", self.path.display()),
            })
    }

    /// Read every well-formed record; malformed lines are skipped
    pub fn read_all(path: &Path) -> Result<Vec<Interaction>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path).map_err(|e| FolioError::Io {
            source: e,
            context: format!("Failed to open interaction log: {}", path.display()),
        })?;

        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| FolioError::Io {
                source: e,
                context: format!("Failed to read {}", path.display()),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping malformed log line {}: {}", n + 1, e),
            }
        }
        Ok(records)
    }
}
