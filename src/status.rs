//! Status file reporting
//!
//! After a run the outcome of every attempted target is written as a single
//! JSON document. Monitoring picks it up through `git-bare-sync metric`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{StatusWriteError, SyncError};
use crate::target::SyncTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// Outcome of one sync attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// `<local name>:<remote identifier>`
    pub target: String,
    pub path: PathBuf,
    pub remote_url: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pruned_branches: Vec<String>,
}

impl StatusRecord {
    pub fn success(target: &SyncTarget, timestamp: DateTime<Utc>, pruned: Vec<String>) -> Self {
        Self {
            target: target.id(),
            path: target.local_path.clone(),
            remote_url: target.remote_url.clone(),
            timestamp,
            outcome: Outcome::Success,
            error: None,
            pruned_branches: pruned,
        }
    }

    pub fn failure(target: &SyncTarget, timestamp: DateTime<Utc>, error: &SyncError) -> Self {
        Self {
            target: target.id(),
            path: target.local_path.clone(),
            remote_url: target.remote_url.clone(),
            timestamp,
            outcome: Outcome::Failure,
            error: Some(error.to_string()),
            pruned_branches: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Document written to the status file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Unix timestamp of the run
    pub updated_at: i64,
    pub statuses: Vec<StatusRecord>,
}

/// Writes run results to the configured status file, if any
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    path: Option<PathBuf>,
}

impl StatusReporter {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write `records`, replacing any previous report.
    ///
    /// Returns `Ok(false)` without touching the filesystem when no status file
    /// is configured.
    pub fn report(&self, records: &[StatusRecord]) -> Result<bool, StatusWriteError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };

        let report = StatusReport {
            updated_at: Utc::now().timestamp(),
            statuses: records.to_vec(),
        };
        let content = serde_json::to_string_pretty(&report)?;

        std::fs::write(path, content).map_err(|source| StatusWriteError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Wrote {} status records to {:?}", records.len(), path);
        Ok(true)
    }

    /// Raw contents of a status file
    pub fn read(path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}
