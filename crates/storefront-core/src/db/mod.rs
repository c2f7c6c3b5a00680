// ============================================================================
// StorefrontDb — Embedded Database (redb)
// ============================================================================
// Durable key-value storage for the cart and session records.
// Default path: ~/.storefront/storefront.redb (override via STOREFRONT_DB_PATH)
// ============================================================================

use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::storage::{MemoryStorage, Storage};
use crate::types::StorageError;

/// Env var overriding the database location
pub const DB_PATH_ENV: &str = "STOREFRONT_DB_PATH";

// Table definitions
const STORAGE: TableDefinition<&str, &str> = TableDefinition::new("storage");

/// Embedded database backing the persisted stores
pub struct StorefrontDb {
    db: Database,
    path: PathBuf,
}

impl StorefrontDb {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses STOREFRONT_DB_PATH or ~/.storefront/storefront.redb
    pub fn open(path: Option<&str>) -> Result<Self, StorageError> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var(DB_PATH_ENV) {
            PathBuf::from(env_path)
        } else {
            default_db_path()?
        };

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Open(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        info!("Opening database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| StorageError::Open(format!("Failed to open database: {}", e)))?;

        // Ensure the table exists by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Open(format!("Failed to begin write: {}", e)))?;
        {
            let _ = write_txn.open_table(STORAGE).map_err(|e| {
                StorageError::Open(format!("Failed to create storage table: {}", e))
            })?;
        }
        write_txn
            .commit()
            .map_err(|e| StorageError::Open(format!("Failed to commit init: {}", e)))?;

        info!("Database ready");

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored key/value pairs, in key order
    pub fn entries(&self) -> Result<Vec<(String, String)>, StorageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Read(format!("Failed to begin read: {}", e)))?;
        let table = read_txn
            .open_table(STORAGE)
            .map_err(|e| StorageError::Read(format!("Failed to open storage table: {}", e)))?;

        let mut results = Vec::new();
        let iter = table
            .range::<&str>(..)
            .map_err(|e| StorageError::Read(format!("Failed to iterate storage: {}", e)))?;
        for entry in iter {
            let (key, value) =
                entry.map_err(|e| StorageError::Read(format!("Failed to read entry: {}", e)))?;
            results.push((key.value().to_string(), value.value().to_string()));
        }
        Ok(results)
    }
}

impl Storage for StorefrontDb {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Read(format!("Failed to begin read: {}", e)))?;
        let table = read_txn
            .open_table(STORAGE)
            .map_err(|e| StorageError::Read(format!("Failed to open storage table: {}", e)))?;

        let value = table
            .get(key)
            .map_err(|e| StorageError::Read(format!("Failed to get '{}': {}", key, e)))?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Write(format!("Failed to begin write: {}", e)))?;
        {
            let mut table = write_txn
                .open_table(STORAGE)
                .map_err(|e| StorageError::Write(format!("Failed to open storage table: {}", e)))?;
            table
                .insert(key, value)
                .map_err(|e| StorageError::Write(format!("Failed to insert '{}': {}", key, e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| StorageError::Write(format!("Failed to commit: {}", e)))?;

        debug!("Stored '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Write(format!("Failed to begin write: {}", e)))?;
        let removed;
        {
            let mut table = write_txn
                .open_table(STORAGE)
                .map_err(|e| StorageError::Write(format!("Failed to open storage table: {}", e)))?;
            removed = table
                .remove(key)
                .map_err(|e| StorageError::Write(format!("Failed to remove '{}': {}", key, e)))?
                .is_some();
        }
        write_txn
            .commit()
            .map_err(|e| StorageError::Write(format!("Failed to commit delete: {}", e)))?;

        if removed {
            debug!("Deleted '{}'", key);
        }
        Ok(removed)
    }
}

/// Open the database, or fall back to in-memory storage (with a warning) when
/// it cannot be opened. The database handle is `None` in the fallback case.
pub fn open_storage(path: Option<&str>) -> (Option<Arc<StorefrontDb>>, Arc<dyn Storage>) {
    match StorefrontDb::open(path) {
        Ok(db) => {
            let db = Arc::new(db);
            let storage: Arc<dyn Storage> = db.clone();
            (Some(db), storage)
        }
        Err(e) => {
            warn!("{} - cart and session will not be saved", e);
            let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
            (None, storage)
        }
    }
}

fn default_db_path() -> Result<PathBuf, StorageError> {
    let home = dirs::home_dir()
        .ok_or_else(|| StorageError::Open("Cannot determine home directory".to_string()))?;
    Ok(home.join(".storefront").join("storefront.redb"))
}
