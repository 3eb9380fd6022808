//! Versioned envelopes for persisted values.
//!
//! Values are written as `{ "schemaVersion": N, "data": ... }`. Values written
//! before envelopes existed are bare JSON and load as schema version 0; record
//! types fill their missing fields through serde defaults and the owning
//! module finishes the migration on load.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{JsonStoreExt, KvStore, StorageError, StorageResult};

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Schema version reported for un-enveloped values
pub const LEGACY_SCHEMA_VERSION: u32 = 0;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    schema_version: u32,
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredValue<T> {
    Current(Envelope<T>),
    Legacy(T),
}

/// A value read from storage together with the schema it was written with
#[derive(Debug)]
pub struct Loaded<T> {
    pub value: T,
    pub schema_version: u32,
}

impl<T> Loaded<T> {
    /// Whether the value predates the current schema
    pub fn needs_migration(&self) -> bool {
        self.schema_version < CURRENT_SCHEMA_VERSION
    }
}

/// Load an enveloped (or legacy bare) value
pub fn load_versioned<S, T>(store: &S, key: &str) -> StorageResult<Option<Loaded<T>>>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    let stored: Option<StoredValue<T>> = store.load_json(key)?;
    match stored {
        Some(StoredValue::Current(envelope)) => {
            if envelope.schema_version > CURRENT_SCHEMA_VERSION {
                return Err(StorageError::UnsupportedSchema(envelope.schema_version));
            }
            Ok(Some(Loaded {
                value: envelope.data,
                schema_version: envelope.schema_version,
            }))
        }
        Some(StoredValue::Legacy(value)) => Ok(Some(Loaded {
            value,
            schema_version: LEGACY_SCHEMA_VERSION,
        })),
        None => Ok(None),
    }
}

/// Store `value` wrapped in a current-version envelope
pub fn save_versioned<S, T>(store: &S, key: &str, value: &T) -> StorageResult<()>
where
    S: KvStore + ?Sized,
    T: Serialize,
{
    store.save_json(
        key,
        &EnvelopeRef {
            schema_version: CURRENT_SCHEMA_VERSION,
            data: value,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::collections::HashMap;

    #[test]
    fn test_saved_values_are_enveloped() {
        let store = MemoryStore::new();
        save_versioned(&store, "key", &vec!["a".to_string()]).unwrap();

        let raw: serde_json::Value = store.load_json("key").unwrap().unwrap();
        assert_eq!(raw["schemaVersion"], CURRENT_SCHEMA_VERSION);
        assert_eq!(raw["data"][0], "a");

        let loaded: Loaded<Vec<String>> = load_versioned(&store, "key").unwrap().unwrap();
        assert_eq!(loaded.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(!loaded.needs_migration());
    }

    #[test]
    fn test_bare_values_load_as_legacy() {
        let store = MemoryStore::new();
        store.put("key", br#"{"doc-1": [1, 2]}"#).unwrap();

        let loaded: Loaded<HashMap<String, Vec<u32>>> =
            load_versioned(&store, "key").unwrap().unwrap();
        assert_eq!(loaded.schema_version, LEGACY_SCHEMA_VERSION);
        assert!(loaded.needs_migration());
        assert_eq!(loaded.value["doc-1"], vec![1, 2]);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let store = MemoryStore::new();
        store
            .put("key", br#"{"schemaVersion": 99, "data": []}"#)
            .unwrap();

        let result: StorageResult<Option<Loaded<Vec<u32>>>> = load_versioned(&store, "key");
        assert!(matches!(result, Err(StorageError::UnsupportedSchema(99))));
    }

    #[test]
    fn test_missing_key() {
        let store = MemoryStore::new();
        let loaded: Option<Loaded<Vec<u32>>> = load_versioned(&store, "key").unwrap();
        assert!(loaded.is_none());
    }
}
