//! ============================================================================
//! Storage - Key-value persistence seam for the stores
//! ============================================================================
//! Stores read their record once on construction and write it back after
//! every mutation. Records are JSON strings under a fixed key per store, so
//! the cart and the session never share a key.
//! ============================================================================

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::types::StorageError;

/// Durable key-value storage used by the stores
pub trait Storage: Send + Sync {
    /// Raw value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`, returning whether it existed
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-process storage. Nothing survives the process; used in tests and as a
/// fallback when the database cannot be opened.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Read("memory storage lock poisoned".to_string()))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.remove(key).is_some())
    }
}

/// Read and decode the record under `key`.
///
/// Missing, unreadable and malformed records all come back as `None`; the
/// caller starts from its default state in every one of those cases.
pub fn load_record<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No persisted record under '{}'", key);
            return None;
        }
        Err(e) => {
            warn!("Failed to read '{}': {} - starting from defaults", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Discarding malformed record under '{}': {}", key, e);
            None
        }
    }
}

/// Encode and write `record` under `key`. Failures are logged, never raised:
/// the in-memory state stays authoritative for the rest of the process.
pub fn save_record<T: Serialize>(storage: &dyn Storage, key: &str, record: &T) {
    let raw = match serde_json::to_string(record) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to encode record for '{}': {}", key, e);
            return;
        }
    };

    if let Err(e) = storage.set(key, &raw) {
        warn!("Failed to persist '{}': {}", key, e);
    }
}

/// Delete the record under `key`. Failures are logged like `save_record`.
pub fn remove_record(storage: &dyn Storage, key: &str) {
    match storage.remove(key) {
        Ok(true) => debug!("Removed record '{}'", key),
        Ok(false) => {}
        Err(e) => warn!("Failed to remove '{}': {}", key, e),
    }
}
