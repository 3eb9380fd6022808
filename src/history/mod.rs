//! Version history: per-document content snapshots and the trash.
//!
//! This module provides:
//! - Capped, newest-first snapshot lists keyed by document id
//! - Debounced snapshot creation driven by content changes
//! - A soft-delete trash with time-based expiry
//!
//! Snapshots are full copies of the content, never diffs. Both the snapshot
//! mapping and the trash are rewritten in full on every mutation.

mod engine;
mod watcher;

pub use engine::VersionHistory;
pub use watcher::SnapshotWatcher;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::documents::Document;

/// A full-content copy of a document at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Millisecond timestamp, strictly increasing within a document
    pub id: String,
    pub content: String,
    /// Document title when the snapshot was taken
    #[serde(default)]
    pub title: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Byte length of `content`
    #[serde(default)]
    pub size: u64,
}

impl Snapshot {
    fn new(id: String, content: &str, title: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            content: content.to_string(),
            title: title.to_string(),
            timestamp,
            size: content.len() as u64,
        }
    }
}

/// A soft-deleted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashEntry {
    #[serde(flatten)]
    pub document: Document,
    pub deleted_at: DateTime<Utc>,
}

impl TrashEntry {
    pub fn id(&self) -> &str {
        &self.document.id
    }
}

/// Configuration for the version history engine
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum snapshots kept per document
    pub max_versions_per_doc: usize,
    /// How long trashed documents are kept
    pub trash_retention: Duration,
    /// Quiet period before a content change is snapshotted
    pub snapshot_debounce: Duration,
    /// Interval of the background trash sweep while running
    pub trash_sweep_interval: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_versions_per_doc: 50,
            trash_retention: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            snapshot_debounce: Duration::from_millis(2000),
            trash_sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}

impl HistoryConfig {
    pub fn with_max_versions(mut self, max: usize) -> Self {
        self.max_versions_per_doc = max;
        self
    }

    pub fn with_trash_retention_days(mut self, days: u64) -> Self {
        self.trash_retention = Duration::from_secs(days.saturating_mul(24 * 60 * 60));
        self
    }

    pub fn with_snapshot_debounce(mut self, debounce: Duration) -> Self {
        self.snapshot_debounce = debounce;
        self
    }

    pub fn with_trash_sweep_interval(mut self, interval: Duration) -> Self {
        self.trash_sweep_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_size_is_byte_length() {
        let snapshot = Snapshot::new("1".into(), "olá", "Doc", Utc::now());
        assert_eq!(snapshot.size, 4);
    }

    #[test]
    fn test_trash_entry_flattens_document() {
        let entry = TrashEntry {
            document: Document::new("Gone").with_content("bye"),
            deleted_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["title"], "Gone");
        assert_eq!(json["content"], "bye");
        assert!(json.get("deletedAt").is_some());
        assert_eq!(json["id"], entry.id());
    }

    #[test]
    fn test_history_config_default() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_versions_per_doc, 50);
        assert_eq!(config.trash_retention, Duration::from_secs(2_592_000));
        assert_eq!(config.snapshot_debounce, Duration::from_millis(2000));
    }

    #[test]
    fn test_huge_retention_saturates() {
        let config = HistoryConfig::default().with_trash_retention_days(u64::MAX);
        assert_eq!(config.trash_retention, Duration::from_secs(u64::MAX));
    }
}
