//! Edit analytics recorder and its debounced front end.

use chrono::{DateTime, Timelike, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{AnalyticsConfig, DocumentStats, EditEvent, TotalStats, MAX_EDIT_GAP_SECS};
use crate::debounce::Debouncer;
use crate::storage::{load_versioned, save_versioned, KvStore, ANALYTICS_KEY};

/// Per-document edit statistics, persisted in full on each edit
pub struct AnalyticsRecorder {
    config: AnalyticsConfig,
    store: Arc<dyn KvStore>,
    stats: RwLock<HashMap<String, DocumentStats>>,
}

impl AnalyticsRecorder {
    pub fn new(store: Arc<dyn KvStore>, config: AnalyticsConfig) -> Self {
        Self {
            config,
            store,
            stats: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Read persisted statistics; unreadable data is discarded
    pub fn load(&self) {
        let stats = match load_versioned::<_, HashMap<String, DocumentStats>>(
            &*self.store,
            ANALYTICS_KEY,
        ) {
            Ok(Some(loaded)) => {
                let migrate = loaded.needs_migration();
                if migrate {
                    info!("Migrating analytics from schema v{}", loaded.schema_version);
                    self.persist(&loaded.value);
                }
                loaded.value
            }
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!("Discarding unreadable analytics: {}", e);
                HashMap::new()
            }
        };

        info!("Loaded analytics for {} documents", stats.len());
        *self.stats.write() = stats;
    }

    /// Record one edit of `doc_id`
    pub fn track_document_edit(&self, doc_id: &str, content_length: usize, title: &str) {
        self.track_document_edit_at(doc_id, content_length, title, Utc::now());
    }

    pub(crate) fn track_document_edit_at(
        &self,
        doc_id: &str,
        content_length: usize,
        title: &str,
        now: DateTime<Utc>,
    ) {
        let mut all = self.stats.write();
        let stats = all
            .entry(doc_id.to_string())
            .or_insert_with(|| DocumentStats::new(doc_id, title, now));

        let time_diff = stats
            .edits
            .last()
            .map(|last| (now - last.timestamp).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
            .clamp(0.0, MAX_EDIT_GAP_SECS);

        stats.title = title.to_string();
        stats.total_edits += 1;
        stats.total_time += time_diff;
        stats.last_edited = Some(now);
        stats.max_length = stats.max_length.max(content_length);
        stats.edits.push(EditEvent {
            timestamp: now,
            content_length,
            time_diff,
        });

        let max_events = self.config.max_edit_events;
        if stats.edits.len() > max_events {
            let overflow = stats.edits.len() - max_events;
            stats.edits.drain(0..overflow);
        }

        self.persist(&all);
    }

    pub fn get_document_stats(&self, doc_id: &str) -> Option<DocumentStats> {
        self.stats.read().get(doc_id).cloned()
    }

    pub fn get_all_stats(&self) -> Vec<DocumentStats> {
        self.stats.read().values().cloned().collect()
    }

    pub fn get_total_stats(&self) -> TotalStats {
        let all = self.stats.read();

        TotalStats {
            total_documents: all.len(),
            total_edits: all.values().map(|s| s.total_edits).sum(),
            total_time: all.values().map(|s| s.total_time).sum(),
            total_characters: all.values().map(|s| s.max_length).sum(),
            last_active: all
                .values()
                .filter(|s| s.last_edited.is_some())
                .max_by_key(|s| s.last_edited)
                .cloned(),
        }
    }

    /// Edit counts per UTC day (`YYYY-MM-DD`)
    pub fn get_edits_by_day(&self) -> BTreeMap<String, u64> {
        let mut by_day = BTreeMap::new();
        for stats in self.stats.read().values() {
            for edit in &stats.edits {
                let day = edit.timestamp.format("%Y-%m-%d").to_string();
                *by_day.entry(day).or_insert(0) += 1;
            }
        }
        by_day
    }

    /// Edit counts per UTC hour; every hour 0..24 is present
    pub fn get_edits_by_hour(&self) -> BTreeMap<u32, u64> {
        let mut by_hour: BTreeMap<u32, u64> = (0..24).map(|hour| (hour, 0)).collect();
        for stats in self.stats.read().values() {
            for edit in &stats.edits {
                *by_hour.entry(edit.timestamp.hour()).or_insert(0) += 1;
            }
        }
        by_hour
    }

    /// Most edited documents, most edits first
    pub fn get_ranking(&self) -> Vec<DocumentStats> {
        let mut ranking = self.get_all_stats();
        ranking.sort_by(|a, b| b.total_edits.cmp(&a.total_edits));
        ranking.truncate(self.config.ranking_size);
        ranking
    }

    fn persist(&self, stats: &HashMap<String, DocumentStats>) {
        if let Err(e) = save_versioned(&*self.store, ANALYTICS_KEY, stats) {
            error!("Failed to save analytics: {}", e);
        }
    }
}

/// Records an edit once a document has been quiet for the configured period
pub struct EditTracker {
    recorder: Arc<AnalyticsRecorder>,
    debouncer: Debouncer,
}

impl EditTracker {
    pub fn new(recorder: Arc<AnalyticsRecorder>) -> Self {
        let debouncer = Debouncer::new(recorder.config().debounce);
        Self { recorder, debouncer }
    }

    pub fn track(&self, doc_id: &str, content_length: usize, title: &str) {
        let recorder = self.recorder.clone();
        let doc_id_owned = doc_id.to_string();
        let title = title.to_string();

        self.debouncer.schedule(doc_id, move || {
            recorder.track_document_edit(&doc_id_owned, content_length, &title);
        });
    }

    pub fn cancel(&self, doc_id: &str) -> bool {
        self.debouncer.cancel(doc_id)
    }
}
