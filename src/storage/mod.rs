//! Storage module for persisting editor state as JSON blobs.
//!
//! Every piece of persisted state (documents, version history, trash,
//! analytics) lives under a single logical key and is rewritten in full on
//! each mutation. The [`KvStore`] trait is the only durability seam: the
//! daemon uses [`SledStore`], tests and ephemeral runs use [`MemoryStore`].

mod memory;
mod schema;
mod sled_store;

pub use memory::MemoryStore;
pub use schema::{load_versioned, save_versioned};
pub use sled_store::SledStore;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Key holding the document set
pub const DOCUMENTS_KEY: &str = "markdown_documents";
/// Key holding the per-document snapshot mapping
pub const VERSIONS_KEY: &str = "markdown_versions";
/// Key holding the trash list
pub const TRASH_KEY: &str = "markdown_trash";
/// Key holding the id of the last active document
pub const LAST_ACTIVE_KEY: &str = "lastActiveDocId";
/// Key holding per-document edit analytics
pub const ANALYTICS_KEY: &str = "markdown_analytics";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Sled database error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage initialization failed: {0}")]
    InitFailed(String),

    #[error("Unsupported schema version: {0}")]
    UnsupportedSchema(u32),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous keyed blob store.
pub trait KvStore: Send + Sync {
    /// Read the raw value under `key`
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the value under `key`
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Force pending writes to durable storage
    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Get storage statistics
    fn stats(&self) -> StorageStats;
}

/// JSON helpers available on every [`KvStore`]
pub trait JsonStoreExt: KvStore {
    /// Load and deserialize the value under `key`
    fn load_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`
    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(key, &bytes)
    }
}

impl<S: KvStore + ?Sized> JsonStoreExt for S {}

/// Statistics about the storage
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    pub key_count: usize,
    pub total_size_bytes: u64,
}

/// Configuration for the storage layer
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to the Sled database directory (`:memory:` selects [`MemoryStore`])
    pub path: String,
    /// Cache size in bytes (default: 64MB)
    pub cache_size: u64,
    /// Flush interval in milliseconds (0 = immediate)
    pub flush_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./data/mdvault.sled".to_string(),
            cache_size: 64 * 1024 * 1024, // 64MB
            flush_interval_ms: 500,
        }
    }
}

impl StorageConfig {
    /// Path value that selects the in-memory store
    pub const IN_MEMORY: &'static str = ":memory:";

    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_cache_size(mut self, size: u64) -> Self {
        self.cache_size = size;
        self
    }

    pub fn with_flush_interval_ms(mut self, interval_ms: u64) -> Self {
        self.flush_interval_ms = interval_ms;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == Self::IN_MEMORY
    }
}
