//! `redb`-backed persistence
//!
//! One table of `&str -> &[u8]`. Every `put`/`delete` commits its own write
//! transaction; prefix scans read a snapshot through `range(prefix..)`.
//! redb holds an exclusive lock on the file while the database is open, so
//! a second store on the same path fails to open.

use super::persistence::KeyValueStore;
use crate::core::error::{LoggerError, Result};
use parking_lot::RwLock;
use redb::{Database, TableDefinition};
use std::path::{Path, PathBuf};

// Key: persistence key (`correlation_id:index`), Value: serialized StoredEntry
const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

fn backend_error(e: impl std::fmt::Display) -> LoggerError {
    LoggerError::persistence(e.to_string())
}

/// Persistent [`KeyValueStore`] in a single redb database file
pub struct RedbKvStore {
    path: PathBuf,
    db: RwLock<Option<Database>>,
}

impl RedbKvStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the directory cannot be created, the file is
    /// not a redb database, or another store already holds it open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let shown_path = path.display().to_string();
        let unavailable = |e: &dyn std::fmt::Display| {
            LoggerError::store_unavailable(shown_path.as_str(), e.to_string())
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| unavailable(&e))?;
        }

        let db = Database::create(&path).map_err(|e| unavailable(&e))?;

        // create the table up front so read transactions always find it
        let write_txn = db.begin_write().map_err(|e| unavailable(&e))?;
        write_txn.open_table(ENTRIES).map_err(|e| unavailable(&e))?;
        write_txn.commit().map_err(|e| unavailable(&e))?;

        tracing::debug!(path = %shown_path, "persistence database opened");

        Ok(Self {
            path,
            db: RwLock::new(Some(db)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let guard = self.db.read();
        let db = Self::ensure_open(&guard)?;
        let read_txn = db.begin_read().map_err(backend_error)?;
        let table = read_txn.open_table(ENTRIES).map_err(backend_error)?;
        let value = table
            .get(key)
            .map_err(backend_error)?
            .map(|v| v.value().to_vec());
        Ok(value)
    }

    fn ensure_open(db: &Option<Database>) -> Result<&Database> {
        db.as_ref()
            .ok_or_else(|| LoggerError::persistence("persistence database is closed"))
    }
}

impl KeyValueStore for RedbKvStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let guard = self.db.read();
        let db = Self::ensure_open(&guard)?;
        let write_txn = db.begin_write().map_err(backend_error)?;
        {
            let mut table = write_txn.open_table(ENTRIES).map_err(backend_error)?;
            table.insert(key, value).map_err(backend_error)?;
        }
        write_txn.commit().map_err(backend_error)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let guard = self.db.read();
        let db = Self::ensure_open(&guard)?;
        let write_txn = db.begin_write().map_err(backend_error)?;
        {
            let mut table = write_txn.open_table(ENTRIES).map_err(backend_error)?;
            table.remove(key).map_err(backend_error)?;
        }
        write_txn.commit().map_err(backend_error)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let guard = self.db.read();
        let db = Self::ensure_open(&guard)?;
        let read_txn = db.begin_read().map_err(backend_error)?;
        let table = read_txn.open_table(ENTRIES).map_err(backend_error)?;

        let mut results = Vec::new();
        for entry in table.range(prefix..).map_err(backend_error)? {
            let (key, value) = entry.map_err(backend_error)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_string(), value.value().to_vec()));
        }
        Ok(results)
    }

    /// Drop the database handle, releasing the file lock
    fn close(&self) -> Result<()> {
        if self.db.write().take().is_some() {
            tracing::debug!(path = %self.path.display(), "persistence database closed");
        }
        Ok(())
    }
}
