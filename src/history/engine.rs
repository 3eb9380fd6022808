//! Version history engine.
//!
//! Holds the snapshot mapping and the trash in memory and mirrors them to the
//! key-value store after each mutation. Writes are best effort: a failed write
//! is logged and the in-memory change is kept, so the next successful write
//! reconciles storage. Lookups of unknown ids return `None`/`false`, never an
//! error.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{HistoryConfig, Snapshot, TrashEntry};
use crate::documents::{Document, DocumentId};
use crate::storage::{load_versioned, save_versioned, KvStore, TRASH_KEY, VERSIONS_KEY};

/// Snapshots per document, newest first
type VersionMap = HashMap<DocumentId, Vec<Snapshot>>;

#[derive(Default)]
struct HistoryState {
    versions: VersionMap,
    /// Newest first
    trash: Vec<TrashEntry>,
}

/// Per-document snapshot history plus the shared trash
pub struct VersionHistory {
    config: HistoryConfig,
    store: Arc<dyn KvStore>,
    state: RwLock<HistoryState>,
}

impl VersionHistory {
    /// Create an empty engine; call [`load`](Self::load) to read persisted state
    pub fn new(store: Arc<dyn KvStore>, config: HistoryConfig) -> Self {
        Self {
            config,
            store,
            state: RwLock::new(HistoryState::default()),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Read persisted history and trash, then purge expired trash.
    ///
    /// Unreadable values are discarded and the engine starts empty for them.
    pub fn load(&self) {
        let (mut versions, versions_migrated) = self.load_value::<VersionMap>(VERSIONS_KEY);
        let (trash, trash_migrated) = self.load_value::<Vec<TrashEntry>>(TRASH_KEY);

        let mut truncated = false;
        for list in versions.values_mut() {
            for snapshot in list.iter_mut() {
                if snapshot.size == 0 && !snapshot.content.is_empty() {
                    snapshot.size = snapshot.content.len() as u64;
                }
            }
            if list.len() > self.config.max_versions_per_doc {
                list.truncate(self.config.max_versions_per_doc);
                truncated = true;
            }
        }

        {
            let mut state = self.state.write();
            state.versions = versions;
            state.trash = trash;

            if versions_migrated || truncated {
                self.persist_versions(&state.versions);
            }
            if trash_migrated {
                self.persist_trash(&state.trash);
            }

            info!(
                "Loaded version history: {} documents, {} trash entries",
                state.versions.len(),
                state.trash.len()
            );
        }

        self.clean_expired_trash();
    }

    fn load_value<T: DeserializeOwned + Default>(&self, key: &str) -> (T, bool) {
        match load_versioned::<_, T>(&*self.store, key) {
            Ok(Some(loaded)) => {
                let migrate = loaded.needs_migration();
                if migrate {
                    info!("Migrating {} from schema v{}", key, loaded.schema_version);
                }
                (loaded.value, migrate)
            }
            Ok(None) => (T::default(), false),
            Err(e) => {
                warn!("Discarding unreadable {}: {}", key, e);
                (T::default(), false)
            }
        }
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Record `content` as the newest snapshot of `doc_id`.
    ///
    /// Returns `None` without touching storage when the newest snapshot
    /// already holds identical content. Lists beyond the cap lose their
    /// oldest entries.
    pub fn create_snapshot(&self, doc_id: &str, content: &str, title: &str) -> Option<Snapshot> {
        let mut state = self.state.write();
        let list = state.versions.entry(doc_id.to_string()).or_default();

        if list.first().is_some_and(|newest| newest.content == content) {
            debug!("Skipping snapshot for {}: content unchanged", doc_id);
            return None;
        }

        let now = Utc::now();
        let snapshot = Snapshot::new(next_snapshot_id(list, now), content, title, now);
        list.insert(0, snapshot.clone());

        let cap = self.config.max_versions_per_doc;
        if list.len() > cap {
            let evicted = list.len() - cap;
            list.truncate(cap);
            debug!("Evicted {} old snapshots for {}", evicted, doc_id);
        }

        self.persist_versions(&state.versions);
        debug!(
            "Created snapshot {} for {} ({} bytes)",
            snapshot.id, doc_id, snapshot.size
        );
        Some(snapshot)
    }

    /// Snapshots of `doc_id`, newest first; empty when there are none
    pub fn get_versions(&self, doc_id: &str) -> Vec<Snapshot> {
        self.state
            .read()
            .versions
            .get(doc_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Content of a snapshot, or `None` if the document or snapshot is unknown.
    ///
    /// The caller applies the content to the document.
    pub fn restore_version(&self, doc_id: &str, version_id: &str) -> Option<String> {
        let state = self.state.read();
        state
            .versions
            .get(doc_id)?
            .iter()
            .find(|snapshot| snapshot.id == version_id)
            .map(|snapshot| snapshot.content.clone())
    }

    /// Remove one snapshot. Returns false if it did not exist.
    pub fn delete_version(&self, doc_id: &str, version_id: &str) -> bool {
        let mut state = self.state.write();
        let Some(list) = state.versions.get_mut(doc_id) else {
            return false;
        };

        let before = list.len();
        list.retain(|snapshot| snapshot.id != version_id);
        if list.len() == before {
            return false;
        }

        self.persist_versions(&state.versions);
        debug!("Deleted snapshot {} of {}", version_id, doc_id);
        true
    }

    /// Remove the whole history of a document. Returns false if it had none.
    pub fn clear_versions(&self, doc_id: &str) -> bool {
        let mut state = self.state.write();
        if state.versions.remove(doc_id).is_none() {
            return false;
        }

        self.persist_versions(&state.versions);
        info!("Cleared version history of {}", doc_id);
        true
    }

    // =========================================================================
    // Trash
    // =========================================================================

    /// Soft-delete a document
    pub fn move_to_trash(&self, document: Document) -> TrashEntry {
        self.move_to_trash_at(document, Utc::now())
    }

    pub(crate) fn move_to_trash_at(&self, document: Document, deleted_at: DateTime<Utc>) -> TrashEntry {
        let entry = TrashEntry {
            document,
            deleted_at,
        };

        let mut state = self.state.write();
        state.trash.insert(0, entry.clone());
        self.persist_trash(&state.trash);

        info!("Moved document {} to trash", entry.id());
        entry
    }

    /// Take a document out of the trash.
    ///
    /// Returns the newest entry for `doc_id` and drops every entry with that id.
    pub fn restore_from_trash(&self, doc_id: &str) -> Option<TrashEntry> {
        let mut state = self.state.write();
        let entry = state.trash.iter().find(|e| e.id() == doc_id)?.clone();

        state.trash.retain(|e| e.id() != doc_id);
        self.persist_trash(&state.trash);

        info!("Restored document {} from trash", doc_id);
        Some(entry)
    }

    /// Permanently remove a trashed document. Returns false if absent.
    pub fn delete_from_trash(&self, doc_id: &str) -> bool {
        let mut state = self.state.write();
        let before = state.trash.len();
        state.trash.retain(|e| e.id() != doc_id);
        if state.trash.len() == before {
            return false;
        }

        self.persist_trash(&state.trash);
        true
    }

    /// Remove every trash entry and the stored trash key. Returns the count removed.
    pub fn empty_trash(&self) -> usize {
        let mut state = self.state.write();
        let removed = state.trash.len();
        state.trash.clear();

        if let Err(e) = self.store.remove(TRASH_KEY) {
            error!("Failed to clear trash: {}", e);
        }

        info!("Emptied trash ({} entries)", removed);
        removed
    }

    /// Purge trash entries older than the retention window. Returns the count purged.
    pub fn clean_expired_trash(&self) -> usize {
        self.clean_expired_trash_at(Utc::now())
    }

    pub(crate) fn clean_expired_trash_at(&self, now: DateTime<Utc>) -> usize {
        let retention_ms =
            i64::try_from(self.config.trash_retention.as_millis()).unwrap_or(i64::MAX);

        let mut state = self.state.write();
        let before = state.trash.len();
        state
            .trash
            .retain(|e| (now - e.deleted_at).num_milliseconds() < retention_ms);

        let purged = before - state.trash.len();
        if purged > 0 {
            self.persist_trash(&state.trash);
            info!("Purged {} expired trash entries", purged);
        }
        purged
    }

    /// Trash entries, newest first
    pub fn trash(&self) -> Vec<TrashEntry> {
        self.state.read().trash.clone()
    }

    /// Combined serialized size of the history and the trash, in bytes
    pub fn get_storage_size(&self) -> usize {
        let state = self.state.read();
        let versions = serde_json::to_vec(&state.versions).map(|v| v.len()).unwrap_or(0);
        let trash = serde_json::to_vec(&state.trash).map(|v| v.len()).unwrap_or(0);
        versions + trash
    }

    /// Periodically purge expired trash until `shutdown` fires
    pub fn start_trash_sweep(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let period = self.config.trash_sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; load() has just swept
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.clean_expired_trash();
                    }
                    _ = shutdown.recv() => {
                        debug!("Trash sweep stopped");
                        break;
                    }
                }
            }
        })
    }

    fn persist_versions(&self, versions: &VersionMap) {
        if let Err(e) = save_versioned(&*self.store, VERSIONS_KEY, versions) {
            error!("Failed to save version history: {}", e);
        }
    }

    fn persist_trash(&self, trash: &[TrashEntry]) {
        if let Err(e) = save_versioned(&*self.store, TRASH_KEY, &trash) {
            error!("Failed to save trash: {}", e);
        }
    }
}

/// Millisecond id for a new snapshot, kept above the newest existing id
fn next_snapshot_id(existing: &[Snapshot], now: DateTime<Utc>) -> String {
    let now_ms = now.timestamp_millis();
    let newest = existing.first().and_then(|s| s.id.parse::<i64>().ok());

    match newest {
        Some(newest) if newest >= now_ms => (newest + 1).to_string(),
        _ => now_ms.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonStoreExt, MemoryStore, StorageError, StorageResult, StorageStats};
    use chrono::Duration;

    fn engine_with(store: Arc<dyn KvStore>, config: HistoryConfig) -> VersionHistory {
        let engine = VersionHistory::new(store, config);
        engine.load();
        engine
    }

    fn engine() -> (Arc<MemoryStore>, VersionHistory) {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(store.clone(), HistoryConfig::default());
        (store, engine)
    }

    /// Store whose writes always fail
    struct FailingStore;

    impl KvStore for FailingStore {
        fn get(&self, _key: &str) -> StorageResult<Option<Vec<u8>>> {
            Ok(None)
        }

        fn put(&self, _key: &str, _value: &[u8]) -> StorageResult<()> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn stats(&self) -> StorageStats {
            StorageStats::default()
        }
    }

    #[test]
    fn test_identical_content_is_deduplicated() {
        let (_, engine) = engine();

        assert!(engine.create_snapshot("A", "Hello", "Doc A").is_some());
        assert!(engine.create_snapshot("A", "Hello", "Doc A").is_none());

        assert_eq!(engine.get_versions("A").len(), 1);
    }

    #[test]
    fn test_dedup_only_compares_newest() {
        let (_, engine) = engine();

        engine.create_snapshot("A", "one", "Doc A");
        engine.create_snapshot("A", "two", "Doc A");
        // Matches an older snapshot but not the newest
        assert!(engine.create_snapshot("A", "one", "Doc A").is_some());

        assert_eq!(engine.get_versions("A").len(), 3);
    }

    #[test]
    fn test_scenario_doc_a() {
        let (_, engine) = engine();

        engine.create_snapshot("A", "Hello", "Doc A");
        engine.create_snapshot("A", "Hello", "Doc A");
        assert_eq!(engine.get_versions("A").len(), 1);

        engine.create_snapshot("A", "Hello World", "Doc A");
        let versions = engine.get_versions("A");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].content, "Hello World");
        assert_eq!(versions[0].title, "Doc A");
        assert_eq!(versions[0].size, 11);
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let (_, engine) = engine();

        for i in 0..60 {
            engine.create_snapshot("A", &format!("content {}", i), "Doc A");
        }

        let versions = engine.get_versions("A");
        assert_eq!(versions.len(), 50);
        assert_eq!(versions[0].content, "content 59");
        assert_eq!(versions[49].content, "content 10");
    }

    #[test]
    fn test_custom_cap() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(store, HistoryConfig::default().with_max_versions(3));

        for i in 0..5 {
            engine.create_snapshot("A", &i.to_string(), "Doc A");
        }

        let contents: Vec<String> = engine
            .get_versions("A")
            .into_iter()
            .map(|s| s.content)
            .collect();
        assert_eq!(contents, vec!["4", "3", "2"]);
    }

    #[test]
    fn test_versions_are_newest_first_with_increasing_ids() {
        let (_, engine) = engine();

        for i in 0..20 {
            engine.create_snapshot("A", &i.to_string(), "Doc A");
        }

        let versions = engine.get_versions("A");
        for pair in versions.windows(2) {
            let newer: i64 = pair[0].id.parse().unwrap();
            let older: i64 = pair[1].id.parse().unwrap();
            assert!(newer > older);
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn test_restore_returns_exact_content() {
        let (_, engine) = engine();

        engine.create_snapshot("A", "first\r\n", "Doc A");
        engine.create_snapshot("A", "sécond 🚀", "Doc A");

        for snapshot in engine.get_versions("A") {
            assert_eq!(
                engine.restore_version("A", &snapshot.id),
                Some(snapshot.content.clone())
            );
        }
    }

    #[test]
    fn test_restore_unknown_returns_none() {
        let (_, engine) = engine();
        engine.create_snapshot("A", "Hello", "Doc A");

        assert_eq!(engine.restore_version("unknown-doc", "unknown-version"), None);
        assert_eq!(engine.restore_version("A", "unknown-version"), None);
    }

    #[test]
    fn test_get_versions_unknown_is_empty() {
        let (_, engine) = engine();
        assert!(engine.get_versions("nobody").is_empty());
    }

    #[test]
    fn test_delete_version() {
        let (_, engine) = engine();
        engine.create_snapshot("A", "one", "Doc A");
        let second = engine.create_snapshot("A", "two", "Doc A").unwrap();

        assert!(engine.delete_version("A", &second.id));
        assert!(!engine.delete_version("A", &second.id));
        assert!(!engine.delete_version("missing", "1"));

        let versions = engine.get_versions("A");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content, "one");
    }

    #[test]
    fn test_clear_versions() {
        let (_, engine) = engine();
        engine.create_snapshot("A", "one", "Doc A");
        engine.create_snapshot("B", "other", "Doc B");

        assert!(engine.clear_versions("A"));
        assert!(!engine.clear_versions("A"));

        assert!(engine.get_versions("A").is_empty());
        assert_eq!(engine.get_versions("B").len(), 1);
    }

    #[test]
    fn test_history_survives_reload() {
        let (store, engine) = engine();
        engine.create_snapshot("A", "Hello", "Doc A");
        engine.move_to_trash(Document::new("Trashed"));

        let reloaded = engine_with(store, HistoryConfig::default());
        assert_eq!(reloaded.get_versions("A")[0].content, "Hello");
        assert_eq!(reloaded.trash().len(), 1);
    }

    #[test]
    fn test_corrupt_storage_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.put(VERSIONS_KEY, b"not json at all").unwrap();
        store.put(TRASH_KEY, b"[{\"broken\"").unwrap();

        let engine = engine_with(store, HistoryConfig::default());
        assert!(engine.get_versions("A").is_empty());
        assert!(engine.trash().is_empty());

        // Still usable afterwards
        assert!(engine.create_snapshot("A", "fresh", "Doc A").is_some());
    }

    #[test]
    fn test_legacy_history_is_migrated() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                VERSIONS_KEY,
                br#"{"A": [{"id": "1700000000000", "content": "legacy", "timestamp": "2023-11-14T22:13:20.000Z"}]}"#,
            )
            .unwrap();

        let engine = engine_with(store.clone(), HistoryConfig::default());
        let versions = engine.get_versions("A");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].size, 6);
        assert!(versions[0].title.is_empty());

        let raw: serde_json::Value = store.load_json(VERSIONS_KEY).unwrap().unwrap();
        assert_eq!(raw["schemaVersion"], 1);

        // New ids stay above legacy ones
        let next = engine.create_snapshot("A", "new", "Doc A").unwrap();
        assert!(next.id.parse::<i64>().unwrap() > 1_700_000_000_000);
    }

    #[test]
    fn test_write_failures_keep_memory_state() {
        let engine = engine_with(Arc::new(FailingStore), HistoryConfig::default());

        assert!(engine.create_snapshot("A", "Hello", "Doc A").is_some());
        assert_eq!(engine.get_versions("A").len(), 1);

        engine.move_to_trash(Document::new("Trashed"));
        assert_eq!(engine.trash().len(), 1);
        assert_eq!(engine.empty_trash(), 1);
        assert!(engine.trash().is_empty());
    }

    #[test]
    fn test_trash_round_trip() {
        let (_, engine) = engine();
        let doc = Document::new("Doc A").with_content("body");
        let id = doc.id.clone();

        engine.move_to_trash(doc.clone());
        assert_eq!(engine.trash()[0].id(), id);

        let restored = engine.restore_from_trash(&id).unwrap();
        assert_eq!(restored.document, doc);
        assert!(engine.trash().is_empty());
        assert!(engine.restore_from_trash(&id).is_none());
    }

    #[test]
    fn test_trash_is_newest_first() {
        let (_, engine) = engine();
        let first = engine.move_to_trash(Document::new("first"));
        let second = engine.move_to_trash(Document::new("second"));

        let trash = engine.trash();
        assert_eq!(trash[0].id(), second.id());
        assert_eq!(trash[1].id(), first.id());
    }

    #[test]
    fn test_delete_from_trash() {
        let (_, engine) = engine();
        let kept = engine.move_to_trash(Document::new("kept"));
        let gone = engine.move_to_trash(Document::new("gone"));

        assert!(engine.delete_from_trash(gone.id()));
        assert!(!engine.delete_from_trash(gone.id()));

        let trash = engine.trash();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].id(), kept.id());
    }

    #[test]
    fn test_empty_trash_removes_key() {
        let (store, engine) = engine();
        engine.move_to_trash(Document::new("a"));
        engine.move_to_trash(Document::new("b"));
        assert!(store.get(TRASH_KEY).unwrap().is_some());

        assert_eq!(engine.empty_trash(), 2);
        assert!(engine.trash().is_empty());
        assert!(store.get(TRASH_KEY).unwrap().is_none());
    }

    #[test]
    fn test_expired_trash_is_purged() {
        let (_, engine) = engine();
        let now = Utc::now();
        let old = engine.move_to_trash_at(Document::new("old"), now - Duration::days(31));
        let recent = engine.move_to_trash_at(Document::new("recent"), now - Duration::days(29));

        assert_eq!(engine.clean_expired_trash_at(now), 1);

        let trash = engine.trash();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].id(), recent.id());
        assert!(trash.iter().all(|e| e.id() != old.id()));

        // Idempotent
        assert_eq!(engine.clean_expired_trash_at(now), 0);
    }

    #[test]
    fn test_trash_entry_at_exact_retention_is_purged() {
        let (_, engine) = engine();
        let now = Utc::now();
        engine.move_to_trash_at(Document::new("boundary"), now - Duration::days(30));
        let inside = engine.move_to_trash_at(
            Document::new("inside"),
            now - Duration::days(30) + Duration::milliseconds(1),
        );

        assert_eq!(engine.clean_expired_trash_at(now), 1);

        let trash = engine.trash();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].id(), inside.id());
    }

    #[test]
    fn test_huge_retention_keeps_old_trash() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(
            store,
            HistoryConfig::default().with_trash_retention_days(u64::MAX),
        );
        let now = Utc::now();
        engine.move_to_trash_at(Document::new("ancient"), now - Duration::days(3650));

        assert_eq!(engine.clean_expired_trash_at(now), 0);
        assert_eq!(engine.trash().len(), 1);
    }

    #[test]
    fn test_load_purges_expired_trash() {
        let store = Arc::new(MemoryStore::new());
        {
            let engine = engine_with(store.clone(), HistoryConfig::default());
            engine.move_to_trash_at(Document::new("old"), Utc::now() - Duration::days(40));
            engine.move_to_trash(Document::new("fresh"));
        }

        let reloaded = engine_with(store, HistoryConfig::default());
        let trash = reloaded.trash();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].document.title, "fresh");
    }

    #[test]
    fn test_storage_size_tracks_contents() {
        let (_, engine) = engine();
        let empty = engine.get_storage_size();

        engine.create_snapshot("A", &"x".repeat(1000), "Doc A");
        let with_snapshot = engine.get_storage_size();
        assert!(with_snapshot >= empty + 1000);

        engine.move_to_trash(Document::new("t").with_content("y".repeat(500)));
        assert!(engine.get_storage_size() >= with_snapshot + 500);
    }

    #[test]
    fn test_next_snapshot_id_bumps_past_clock() {
        let now = Utc::now();
        let ahead = Snapshot::new(
            (now.timestamp_millis() + 5).to_string(),
            "x",
            "t",
            now,
        );

        let id = next_snapshot_id(&[ahead], now);
        assert_eq!(id, (now.timestamp_millis() + 6).to_string());
        assert_eq!(next_snapshot_id(&[], now), now.timestamp_millis().to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trash_sweep_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(engine_with(
            store,
            HistoryConfig::default().with_trash_sweep_interval(std::time::Duration::from_secs(60)),
        ));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = engine.clone().start_trash_sweep(shutdown_rx);
        tokio::time::sleep(std::time::Duration::from_secs(130)).await;

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trash_sweep_purges_expired_entries() {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(engine_with(
            store,
            HistoryConfig::default().with_trash_sweep_interval(std::time::Duration::from_secs(60)),
        ));
        let expired =
            engine.move_to_trash_at(Document::new("stale"), Utc::now() - Duration::days(31));
        let fresh = engine.move_to_trash(Document::new("fresh"));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = engine.clone().start_trash_sweep(shutdown_rx);

        // Nothing runs before the first full interval
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert_eq!(engine.trash().len(), 2);

        tokio::time::sleep(std::time::Duration::from_secs(45)).await;
        let trash = engine.trash();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].id(), fresh.id());
        assert!(trash.iter().all(|e| e.id() != expired.id()));

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
