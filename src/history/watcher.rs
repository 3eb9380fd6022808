//! Debounced snapshot trigger.
//!
//! Content changes are fed in as they happen. A snapshot is only attempted
//! once a document has been quiet for the configured period, and it captures
//! the last content seen.

use std::sync::Arc;
use tracing::debug;

use super::VersionHistory;
use crate::debounce::Debouncer;

/// Watches content changes and snapshots each document after a quiet period
pub struct SnapshotWatcher {
    history: Arc<VersionHistory>,
    debouncer: Debouncer,
}

impl SnapshotWatcher {
    pub fn new(history: Arc<VersionHistory>) -> Self {
        let debouncer = Debouncer::new(history.config().snapshot_debounce);
        Self { history, debouncer }
    }

    /// Record a content change, restarting the quiet period for `doc_id`
    pub fn watch(&self, doc_id: &str, content: &str, title: &str) {
        let history = self.history.clone();
        let doc_id_owned = doc_id.to_string();
        let content = content.to_string();
        let title = title.to_string();

        self.debouncer.schedule(doc_id, move || {
            if history.create_snapshot(&doc_id_owned, &content, &title).is_none() {
                debug!("Debounced snapshot for {} was a duplicate", doc_id_owned);
            }
        });
    }

    /// Drop the pending snapshot for `doc_id`, e.g. when it is deleted
    pub fn cancel(&self, doc_id: &str) -> bool {
        self.debouncer.cancel(doc_id)
    }

    /// Number of documents waiting for a snapshot
    pub fn pending(&self) -> usize {
        self.debouncer.pending_count()
    }
}
