//! In-memory key-value store for tests and ephemeral sessions.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::{KvStore, StorageResult, StorageStats};

/// Non-durable store; contents vanish with the process
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn stats(&self) -> StorageStats {
        let entries = self.entries.read();
        StorageStats {
            key_count: entries.len(),
            total_size_bytes: entries.values().map(|v| v.len() as u64).sum(),
        }
    }
}
