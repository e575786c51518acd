//! Task definition and types

use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Request parameters describing the submitted work
/// (e.g. `instrument`, `reference`, `clustering`)
pub type TaskParams = HashMap<String, String>;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Full string form, for places where the short `Display` is too lossy
    pub fn full(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Result artifact for a completed task - an opaque byte blob plus the
/// filename to deliver it under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskArtifact {
    /// Artifact content
    pub bytes: Vec<u8>,

    /// Delivery filename
    pub filename: String,
}

impl TaskArtifact {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }
}

/// A single timestamped entry in a task's log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Log content
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }

    /// Render as `[HH:MM:SS.mmm] message` for status displays
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.message
        )
    }
}

/// The tracked state of one unit of user-submitted work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task identifier
    pub id: TaskId,

    /// Submitting principal (opaque string key)
    pub owner_id: String,

    /// Submitted input filename
    pub filename: String,

    /// Request parameters
    pub params: TaskParams,

    /// Current status
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the pipeline started executing
    pub started_at: Option<DateTime<Utc>>,

    /// When the task reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,

    /// Append-only progress log
    pub log: Vec<LogEntry>,

    /// Result artifact; present if and only if status is Completed
    pub result: Option<TaskArtifact>,
}

impl TaskRecord {
    /// Create a new pending record
    pub fn new(owner_id: impl Into<String>, filename: impl Into<String>, params: TaskParams) -> Self {
        Self {
            id: TaskId::new(),
            owner_id: owner_id.into(),
            filename: filename.into(),
            params,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            log: Vec::new(),
            result: None,
        }
    }

    /// Check if the task is still active (pending or running)
    pub fn is_active(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::Running)
    }

    /// Look up a request parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Check if `params` contains every filter key with an equal value.
    /// A key missing from `params` never matches.
    pub fn matches_filters(&self, filters: &TaskParams) -> bool {
        filters
            .iter()
            .all(|(k, v)| self.params.get(k).is_some_and(|p| p == v))
    }

    /// Execution duration if the pipeline has started
    pub fn duration(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some((end - start).to_std().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> TaskParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_task_id_unique() {
        let id1 = TaskId::new();
        let id2 = TaskId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_task_id_display_short() {
        let id = TaskId::new();
        assert_eq!(id.to_string().len(), 8);
        assert!(id.full().starts_with(&id.to_string()));
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = TaskRecord::new("u1", "sample.fastq", params(&[("instrument", "DADA2")]));
        assert_eq!(record.status, TaskStatus::Pending);
        assert!(record.is_active());
        assert!(record.result.is_none());
        assert!(record.started_at.is_none());
        assert_eq!(record.param("instrument"), Some("DADA2"));
    }

    #[test]
    fn test_matches_filters() {
        let record = TaskRecord::new(
            "u1",
            "sample.fastq",
            params(&[("instrument", "QIIME2"), ("reference", "SILVA")]),
        );

        assert!(record.matches_filters(&params(&[])));
        assert!(record.matches_filters(&params(&[("instrument", "QIIME2")])));
        assert!(record.matches_filters(&params(&[("instrument", "QIIME2"), ("reference", "SILVA")])));
        assert!(!record.matches_filters(&params(&[("instrument", "DADA2")])));
        // Missing key never matches
        assert!(!record.matches_filters(&params(&[("clustering", "OTU")])));
    }

    #[test]
    fn test_log_entry_format() {
        let entry = LogEntry::new("Quality control: collecting metrics");
        let line = entry.format_line();
        assert!(line.contains("Quality control"));
        assert!(line.starts_with('['));
    }
}
