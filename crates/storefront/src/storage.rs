//! Durable key/value storage - the persistence mirror behind the stores.
//!
//! Values are JSON-encoded strings under fixed keys. The in-memory store
//! state owns the data; the durable copy is a mirror, written
//! fire-and-forget after each mutation. A malformed persisted value is
//! never surfaced: the offending entry is deleted and the caller sees an
//! absent value.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key contains characters the backend cannot map to a file name.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// String-keyed durable key/value storage.
///
/// Implementations must tolerate concurrent handles within one process;
/// cross-process writers are only ever observed through explicit re-reads.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write the raw value under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value under `key`. Deleting an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// JSON helpers - the malformed-state policy lives here
// =============================================================================

/// Read and deserialize the value under `key`.
///
/// A value that fails to parse is deleted and reported absent; storage
/// read failures are logged and reported absent. Neither surfaces to the
/// caller.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(key, error = %err, "storage read failed");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "discarding malformed persisted value");
            remove(store, key);
            None
        }
    }
}

/// Serialize and write `value` under `key`, fire-and-forget.
///
/// The in-memory state is already updated when this runs; a failed mirror
/// write is logged and swallowed.
pub fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(key, error = %err, "failed to serialize value for storage");
            return;
        }
    };
    if let Err(err) = store.set(key, &raw) {
        tracing::warn!(key, error = %err, "storage write failed");
    }
}

/// Delete the value under `key`, fire-and-forget.
pub fn remove(store: &dyn KeyValueStore, key: &str) {
    if let Err(err) = store.remove(key) {
        tracing::warn!(key, error = %err, "storage delete failed");
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// File-backed storage: one file per key under a configured directory.
///
/// Writes go through a temp file and rename so a crash mid-write leaves
/// the previous value intact.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory storage for tests and embedders without a filesystem.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store behind an `Arc`, ready for injection.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .map
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("clementine-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_owned()));
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        // removing an absent key is a no-op
        store.remove("a").unwrap();
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = temp_dir();
        let store = FileStore::new(&dir).unwrap();
        assert_eq!(store.get("session").unwrap(), None);
        store.set("session", "{\"x\":1}").unwrap();
        assert_eq!(store.get("session").unwrap(), Some("{\"x\":1}".to_owned()));
        store.remove("session").unwrap();
        assert_eq!(store.get("session").unwrap(), None);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_traversal_keys() {
        let dir = temp_dir();
        let store = FileStore::new(&dir).unwrap();
        assert!(matches!(
            store.get("../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(store.set("", "x"), Err(StorageError::InvalidKey(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = temp_dir();
        {
            let store = FileStore::new(&dir).unwrap();
            store.set("favorites", "[1,2]").unwrap();
        }
        let store = FileStore::new(&dir).unwrap();
        assert_eq!(store.get("favorites").unwrap(), Some("[1,2]".to_owned()));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_json_deletes_malformed_value() {
        let store = MemoryStore::new();
        store.set("bad", "{not json").unwrap();

        let value: Option<Vec<i32>> = read_json(&store, "bad");
        assert_eq!(value, None);
        // the offending entry is gone: a second read sees nothing to parse
        assert_eq!(store.get("bad").unwrap(), None);
    }

    #[test]
    fn test_read_write_json_roundtrip() {
        let store = MemoryStore::new();
        write_json(&store, "nums", &vec![1, 2, 3]);
        let value: Option<Vec<i32>> = read_json(&store, "nums");
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
