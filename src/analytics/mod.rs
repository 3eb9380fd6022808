//! Analytics module: per-document edit statistics for the dashboard.
//!
//! Edits are recorded after a quiet period per document, so a burst of
//! keystrokes counts as one edit event.

mod recorder;

pub use recorder::{AnalyticsRecorder, EditTracker};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest gap credited to a single edit, in seconds
pub const MAX_EDIT_GAP_SECS: f64 = 300.0;

/// One recorded edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEvent {
    pub timestamp: DateTime<Utc>,
    pub content_length: usize,
    /// Seconds since the previous edit, capped at [`MAX_EDIT_GAP_SECS`]
    pub time_diff: f64,
}

/// Accumulated statistics for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub total_edits: u64,
    /// Seconds spent editing
    #[serde(default)]
    pub total_time: f64,
    #[serde(default)]
    pub last_edited: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Most recent edits, oldest first
    #[serde(default)]
    pub edits: Vec<EditEvent>,
    #[serde(default)]
    pub max_length: usize,
}

impl DocumentStats {
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            total_edits: 0,
            total_time: 0.0,
            last_edited: None,
            created_at: now,
            edits: Vec::new(),
            max_length: 0,
        }
    }
}

/// Totals across every tracked document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    pub total_documents: usize,
    pub total_edits: u64,
    pub total_time: f64,
    /// Sum of each document's largest recorded length
    pub total_characters: usize,
    /// Most recently edited document
    pub last_active: Option<DocumentStats>,
}

/// Configuration for analytics recording
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Quiet period before an edit is recorded
    pub debounce: Duration,
    /// Edit events kept per document
    pub max_edit_events: usize,
    /// Number of documents in the ranking
    pub ranking_size: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(5000),
            max_edit_events: 100,
            ranking_size: 10,
        }
    }
}

impl AnalyticsConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}
