use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::persist::write_json_atomic;
use crate::types::{HistoryEntry, HistoryLog, TriageResult};

/// Durable log of past triage runs, one JSON array on disk.
///
/// The log is never pruned; every run appends one entry.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, unreadable or malformed storage yields an empty log.
    pub fn load(&self) -> HistoryLog {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history at {}, starting fresh", self.path.display());
                return HistoryLog::new();
            }
            Err(e) => {
                warn!("Failed to read history {}: {}, starting fresh", self.path.display(), e);
                return HistoryLog::new();
            }
        };
        match serde_json::from_str::<HistoryLog>(&text) {
            Ok(log) => log,
            Err(e) => {
                warn!("History {} is corrupt ({}), starting fresh", self.path.display(), e);
                HistoryLog::new()
            }
        }
    }

    pub fn save(&self, log: &HistoryLog) -> Result<()> {
        write_json_atomic(&self.path, log)
            .with_context(|| format!("Failed to save history to {}", self.path.display()))
    }

    /// Append this run's problematic set to `log` and persist it.
    pub fn record_run(
        &self,
        log: &mut HistoryLog,
        timestamp: DateTime<Utc>,
        problematic_pods: &[TriageResult],
    ) -> Result<()> {
        log.append(HistoryEntry {
            timestamp,
            problematic_pods: problematic_pods.to_vec(),
        });
        self.save(log)
    }
}
