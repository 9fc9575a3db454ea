//! Keyed byte-store backends for write-behind persistence
//!
//! The store only needs ordered keys and prefix scans. Keys follow
//! `correlation_id + ":" + zero-padded index`, so a prefix scan over one
//! correlation id yields its entries in insertion order without any
//! secondary index.

use crate::core::error::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Digits used for the index part of a key (enough for any `u64`)
pub const INDEX_WIDTH: usize = 20;

/// Build the persistence key of an entry
///
/// ```
/// use log_distributor::store::persistence_key;
///
/// assert_eq!(persistence_key("req-1", 42), "req-1:00000000000000000042");
/// ```
pub fn persistence_key(correlation_id: &str, index: u64) -> String {
    format!("{}:{:0width$}", correlation_id, index, width = INDEX_WIDTH)
}

/// Split a key back into correlation id and index
pub fn parse_key(key: &str) -> Option<(&str, u64)> {
    let (correlation_id, index) = key.rsplit_once(':')?;
    if index.len() != INDEX_WIDTH {
        return None;
    }
    index.parse().ok().map(|index| (correlation_id, index))
}

/// Opaque ordered key/value store used for persistence.
///
/// Implementations must be safe to call from the store's persistence and
/// eviction threads concurrently.
pub trait KeyValueStore: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    /// All entries whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Release the underlying resources; later calls may fail
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Collect the entries of an ordered map under `prefix`
fn scan_map(map: &BTreeMap<String, Vec<u8>>, prefix: &str) -> Vec<(String, Vec<u8>)> {
    map.range(prefix.to_string()..)
        .take_while(|(key, _)| key.starts_with(prefix))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// In-process backend, mainly for tests and for sharing one backend
/// between several stores in a single process
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(scan_map(&self.entries.read(), prefix))
    }
}
