//! Document module: the set of markdown documents being edited.
//!
//! Documents are the live editor state. The registry always holds at least one
//! document and remembers which one was active last.

mod registry;

pub use registry::DocumentRegistry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a document
pub type DocumentId = String;

/// Title given to documents created without one
pub const DEFAULT_TITLE: &str = "Untitled document";

/// A markdown document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique, immutable identifier
    pub id: DocumentId,
    #[serde(default)]
    pub title: String,
    /// Markdown body
    #[serde(default)]
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// False whenever content changed since the last explicit save
    #[serde(default = "default_saved")]
    pub is_saved: bool,
}

fn default_saved() -> bool {
    true
}

impl Document {
    /// Create a blank document
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content: String::new(),
            created_at: now,
            updated_at: now,
            is_saved: true,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// Partial update applied to a document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl DocumentUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}
