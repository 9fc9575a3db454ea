//! Correlation-indexed event store and its persistence backends

pub mod log_store;
pub mod persistence;
#[cfg(feature = "persistent")]
pub mod redb_kv;

pub use log_store::{EvictionReport, LogStore, NO_INDEX};
pub use persistence::{parse_key, persistence_key, KeyValueStore, MemoryKvStore, INDEX_WIDTH};
#[cfg(feature = "persistent")]
pub use redb_kv::RedbKvStore;
