//! Sled-based implementation of the key-value store.
//!
//! All logical keys share one tree. Values are the raw JSON bytes produced by
//! [`JsonStoreExt`](super::JsonStoreExt); sled only sees opaque blobs.

use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{KvStore, StorageConfig, StorageError, StorageResult, StorageStats};

/// Tree holding every logical key
const TREE_KV: &str = "kv";

/// Durable key-value store backed by sled
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    kv: Tree,
}

impl SledStore {
    /// Open or create a store at the configured path
    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        let path = Path::new(&config.path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::InitFailed(format!("Failed to create directory: {}", e))
            })?;
        }

        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_size)
            .flush_every_ms(if config.flush_interval_ms > 0 {
                Some(config.flush_interval_ms)
            } else {
                None
            })
            .open()?;

        let kv = db.open_tree(TREE_KV)?;
        debug!("Opened sled store at {} ({} keys)", config.path, kv.len());

        Ok(Self { db: Arc::new(db), kv })
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.kv.get(key.as_bytes())?.map(|value| value.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.kv.insert(key.as_bytes(), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.kv.remove(key.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn stats(&self) -> StorageStats {
        StorageStats {
            key_count: self.kv.len(),
            total_size_bytes: self.db.size_on_disk().unwrap_or(0),
        }
    }
}

impl Drop for SledStore {
    fn drop(&mut self) {
        // Clones share the db; only the last handle needs to flush
        if Arc::strong_count(&self.db) == 1 {
            if let Err(e) = self.db.flush() {
                warn!("Failed to flush sled store on drop: {}", e);
            }
        }
    }
}
