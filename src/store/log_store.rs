//! Correlation-indexed, TTL-evicting event store
//!
//! Every stored event gets the next sequence number and is appended to the
//! global timeline and, when it carries a correlation id, to that id's
//! bucket. Queries copy the matching events out and sort the copy, so
//! callers never observe a live view.
//!
//! A background thread evicts events older than `now - ttl` on a fixed
//! interval. With a persistence backend attached, stored events are also
//! queued (non-blocking) to a write-behind thread that writes them as
//! [`StoredEntry`] values; a full queue skips persistence for that event,
//! memory stays authoritative.

#[cfg(feature = "persistent")]
use super::redb_kv::RedbKvStore;
use super::persistence::{parse_key, persistence_key, KeyValueStore};
use crate::core::{
    error::{LoggerError, Result},
    event::sub_duration,
    overflow::report_overflow,
    shutdown::WorkerHandle,
    Event, LogLevel, Processor, StoreConfig, StoreMetrics, StoredEntry,
};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// What one eviction cycle removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Events removed from memory
    pub memory: usize,
    /// Entries deleted from the persistence backend
    pub persisted: usize,
}

impl EvictionReport {
    pub fn total(&self) -> usize {
        self.memory + self.persisted
    }
}

/// Never assigned; `store` returns it when no index is left
pub const NO_INDEX: u64 = 0;

/// Top of the index space, never assigned either so `next_index` cannot overflow
const RESERVED_INDEX: u64 = u64::MAX;

struct StoreIndex {
    next_index: u64,
    correlations: HashMap<String, Vec<Arc<Event>>>,
    timeline: Vec<Arc<Event>>,
}

impl StoreIndex {
    fn new() -> Self {
        Self {
            next_index: 1,
            correlations: HashMap::new(),
            timeline: Vec::new(),
        }
    }

    /// Assign the next index and insert; `None` once the index space is used up
    fn insert(&mut self, mut event: Event) -> Option<Arc<Event>> {
        if self.next_index == RESERVED_INDEX {
            return None;
        }
        event.index = self.next_index;
        self.next_index += 1;
        let event = Arc::new(event);
        self.push(Arc::clone(&event));
        Some(event)
    }

    /// Make sure `index` is never handed out again
    fn reserve_through(&mut self, index: u64) {
        if index < RESERVED_INDEX {
            self.next_index = self.next_index.max(index + 1);
        }
    }

    /// Re-insert an event that already carries its index
    fn insert_restored(&mut self, event: Event) {
        self.reserve_through(event.index);
        self.push(Arc::new(event));
    }

    fn push(&mut self, event: Arc<Event>) {
        if event.is_correlated() {
            self.correlations
                .entry(event.correlation_id.clone())
                .or_default()
                .push(Arc::clone(&event));
        }
        self.timeline.push(event);
    }

    /// Drop everything older than `cutoff`, returning how many events left
    fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.timeline.len();
        self.timeline.retain(|event| event.timestamp >= cutoff);
        self.correlations.retain(|_, bucket| {
            bucket.retain(|event| event.timestamp >= cutoff);
            !bucket.is_empty()
        });
        before - self.timeline.len()
    }
}

fn ascending(mut events: Vec<Arc<Event>>) -> Vec<Event> {
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.index.cmp(&b.index)));
    events.into_iter().map(|event| (*event).clone()).collect()
}

struct StoreInner {
    ttl: Duration,
    index: RwLock<StoreIndex>,
    backend: Option<Arc<dyn KeyValueStore>>,
    persist_queue: RwLock<Option<Sender<StoredEntry>>>,
    metrics: StoreMetrics,
}

impl StoreInner {
    fn evict_expired(&self, now: DateTime<Utc>) -> EvictionReport {
        let cutoff = sub_duration(now, self.ttl);
        let memory = self.index.write().evict_before(cutoff);
        let persisted = self.evict_persisted(now);

        let report = EvictionReport { memory, persisted };
        if report.memory > 0 {
            self.metrics.record_evicted(report.memory as u64);
        }
        report
    }

    /// Scan-and-delete against the backend using each entry's own expiry
    fn evict_persisted(&self, now: DateTime<Utc>) -> usize {
        let Some(backend) = &self.backend else {
            return 0;
        };
        let entries = match backend.scan_prefix("") {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "persistence scan failed, skipping persisted eviction");
                return 0;
            }
        };

        let mut deleted = 0;
        for (key, value) in entries {
            if parse_key(&key).is_none() {
                continue;
            }
            let expired = match serde_json::from_slice::<StoredEntry>(&value) {
                Ok(entry) => entry.is_expired(now),
                Err(_) => true,
            };
            if !expired {
                continue;
            }
            match backend.delete(&key) {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to delete expired entry");
                }
            }
        }
        deleted
    }

    fn persist(&self, backend: &dyn KeyValueStore, entry: &StoredEntry) {
        let key = persistence_key(&entry.event.correlation_id, entry.event.index);
        let result = serde_json::to_vec(entry)
            .map_err(LoggerError::from)
            .and_then(|value| backend.put(&key, &value));
        match result {
            Ok(()) => {
                self.metrics.record_persisted();
            }
            Err(e) => {
                self.metrics.record_persistence_failure();
                tracing::warn!(key = %key, error = %e, "write-behind persistence failed");
            }
        }
    }

    fn run_eviction(&self, interval: Duration, shutdown: Receiver<()>) {
        let ticker = tick(interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    let report = self.evict_expired(Utc::now());
                    if report.total() > 0 {
                        tracing::debug!(
                            memory = report.memory,
                            persisted = report.persisted,
                            "evicted expired events"
                        );
                    }
                }
                recv(shutdown) -> _ => break,
            }
        }
    }

    /// Write-behind loop; entries still queued at shutdown are abandoned
    fn run_persistence(
        &self,
        backend: Arc<dyn KeyValueStore>,
        queue: Receiver<StoredEntry>,
        shutdown: Receiver<()>,
    ) {
        loop {
            select! {
                recv(queue) -> msg => match msg {
                    Ok(entry) => self.persist(backend.as_ref(), &entry),
                    Err(_) => break,
                },
                recv(shutdown) -> _ => break,
            }
        }
    }
}

struct StoreWorkers {
    eviction: WorkerHandle,
    persistence: Option<WorkerHandle>,
}

/// The queryable record of recent events
///
/// # Example
///
/// ```
/// use log_distributor::prelude::*;
/// use chrono::{Duration, Utc};
///
/// let store = LogStore::new(StoreConfig::default()).unwrap();
/// let now = Utc::now();
/// for offset in [0, 2, 1] {
///     store.store(
///         Event::new(LogLevel::Info, format!("t-{}", offset))
///             .with_correlation_id("r1")
///             .at(now - Duration::seconds(offset)),
///     );
/// }
///
/// let messages: Vec<String> = store
///     .get_by_correlation("r1")
///     .into_iter()
///     .map(|event| event.message)
///     .collect();
/// assert_eq!(messages, ["t-2", "t-1", "t-0"]);
/// ```
pub struct LogStore {
    inner: Arc<StoreInner>,
    workers: Mutex<Option<StoreWorkers>>,
}

impl LogStore {
    /// Build a store from configuration.
    ///
    /// With `persistence_path` set, the database at that path is opened and
    /// its non-expired entries are reloaded. If it cannot be opened the
    /// store warns once and runs memory-only.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let config = config.normalized();
        let backend = match &config.persistence_path {
            Some(path) => Self::open_backend(path),
            None => None,
        };

        match backend {
            Some(backend) => match Self::open(config.clone(), backend) {
                Ok(store) => Ok(store),
                Err(e @ LoggerError::StoreUnavailable { .. }) => {
                    tracing::warn!(error = %e, "persistence unavailable, continuing memory-only");
                    Self::build(config, None)
                }
                Err(e) => Err(e),
            },
            None => Self::build(config, None),
        }
    }

    #[cfg(feature = "persistent")]
    fn open_backend(path: &std::path::Path) -> Option<Arc<dyn KeyValueStore>> {
        match RedbKvStore::open(path) {
            Ok(kv) => Some(Arc::new(kv)),
            Err(e) => {
                tracing::warn!(error = %e, "persistence unavailable, continuing memory-only");
                None
            }
        }
    }

    #[cfg(not(feature = "persistent"))]
    fn open_backend(path: &std::path::Path) -> Option<Arc<dyn KeyValueStore>> {
        tracing::warn!(
            path = %path.display(),
            "built without the `persistent` feature, continuing memory-only"
        );
        None
    }

    /// Build a store on an explicit persistence backend, reloading every
    /// non-expired entry it holds.
    ///
    /// Expired or undecodable entries are deleted from the backend. Index
    /// numbering continues after the highest persisted index, stale entries
    /// included, so a key is never reused. A key carrying index `u64::MAX`
    /// is not a valid entry and is deleted.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the backend cannot be scanned.
    pub fn open(config: StoreConfig, backend: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::build(config.normalized(), Some(backend))
    }

    /// Memory-only store
    pub fn memory(config: StoreConfig) -> Result<Self> {
        Self::build(config.normalized(), None)
    }

    fn build(config: StoreConfig, backend: Option<Arc<dyn KeyValueStore>>) -> Result<Self> {
        let mut index = StoreIndex::new();
        if let Some(backend) = &backend {
            let restored = restore(backend.as_ref(), &mut index, Utc::now())?;
            if restored > 0 {
                tracing::debug!(restored, next_index = index.next_index, "reloaded persisted events");
            }
        }

        let (sender, receiver) = match backend {
            Some(_) => {
                let (tx, rx) = bounded(config.persistence_queue);
                (Some(tx), Some(rx))
            }
            None => (None, None),
        };

        let inner = Arc::new(StoreInner {
            ttl: config.ttl,
            index: RwLock::new(index),
            backend,
            persist_queue: RwLock::new(sender),
            metrics: StoreMetrics::new(),
        });

        let eviction_inner = Arc::clone(&inner);
        let interval = config.cleanup_interval;
        let eviction = WorkerHandle::spawn("store-eviction", move |shutdown| {
            eviction_inner.run_eviction(interval, shutdown)
        })?;

        let persistence = match (receiver, inner.backend.clone()) {
            (Some(queue), Some(backend)) => {
                let persist_inner = Arc::clone(&inner);
                Some(WorkerHandle::spawn("store-persistence", move |shutdown| {
                    persist_inner.run_persistence(backend, queue, shutdown)
                })?)
            }
            _ => None,
        };

        Ok(Self {
            inner,
            workers: Mutex::new(Some(StoreWorkers {
                eviction,
                persistence,
            })),
        })
    }

    /// Insert an event, returning the index it was assigned.
    ///
    /// Indices start at 1. Returns [`NO_INDEX`] without storing anything once
    /// the index space is exhausted, which only a backend holding keys near
    /// `u64::MAX` can cause.
    pub fn store(&self, event: Event) -> u64 {
        let Some(event) = self.inner.index.write().insert(event) else {
            tracing::error!("log store index space exhausted, event dropped");
            return NO_INDEX;
        };
        self.inner.metrics.record_stored();

        if let Some(queue) = &*self.inner.persist_queue.read() {
            let entry = StoredEntry::new((*event).clone(), self.inner.ttl);
            if let Err(TrySendError::Full(_)) = queue.try_send(entry) {
                let previous = self.inner.metrics.record_persistence_skipped();
                report_overflow("log_store persistence", previous, 1, None);
            }
        }
        event.index
    }

    /// Events of one correlation id, timestamp ascending
    pub fn get_by_correlation(&self, correlation_id: &str) -> Vec<Event> {
        let bucket = self
            .inner
            .index
            .read()
            .correlations
            .get(correlation_id)
            .cloned()
            .unwrap_or_default();
        ascending(bucket)
    }

    /// Like [`LogStore::get_by_correlation`], keeping levels `>= min_level`
    pub fn get_by_correlation_with_level(
        &self,
        correlation_id: &str,
        min_level: LogLevel,
    ) -> Vec<Event> {
        let bucket: Vec<Arc<Event>> = match self.inner.index.read().correlations.get(correlation_id) {
            Some(bucket) => bucket
                .iter()
                .filter(|event| event.level.is_enabled(min_level))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        ascending(bucket)
    }

    /// Events with a timestamp strictly after `since`, timestamp ascending
    pub fn get_since(&self, since: DateTime<Utc>) -> Vec<Event> {
        let matching: Vec<Arc<Event>> = self
            .inner
            .index
            .read()
            .timeline
            .iter()
            .filter(|event| event.timestamp > since)
            .cloned()
            .collect();
        ascending(matching)
    }

    /// At most `limit` most recent events, newest first. Equal timestamps
    /// are ordered by index, higher first.
    pub fn get_recent(&self, limit: usize) -> Vec<Event> {
        if limit == 0 {
            return Vec::new();
        }
        let mut events: Vec<Arc<Event>> = self.inner.index.read().timeline.clone();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.index.cmp(&a.index)));
        events.truncate(limit);
        events.into_iter().map(|event| (*event).clone()).collect()
    }

    /// Correlation ids that currently hold at least one event
    pub fn get_correlation_ids(&self) -> BTreeSet<String> {
        self.inner.index.read().correlations.keys().cloned().collect()
    }

    /// Run one eviction cycle now
    pub fn evict_expired(&self) -> EvictionReport {
        self.inner.evict_expired(Utc::now())
    }

    /// Number of events in the timeline
    pub fn len(&self) -> usize {
        self.inner.index.read().timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.backend.is_some()
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.inner.metrics
    }

    /// Stop the eviction and persistence threads and release the backend.
    ///
    /// Entries still waiting in the persistence queue may be abandoned. The
    /// in-memory index stays queryable. Idempotent.
    pub fn close(&self) -> Result<()> {
        let Some(workers) = self.workers.lock().take() else {
            return Ok(());
        };

        self.inner.persist_queue.write().take();
        workers.eviction.stop();
        if let Some(persistence) = workers.persistence {
            persistence.stop();
        }

        match &self.inner.backend {
            Some(backend) => backend.close(),
            None => Ok(()),
        }
    }
}

/// Reload non-expired entries from `backend` into `index`
fn restore(backend: &dyn KeyValueStore, index: &mut StoreIndex, now: DateTime<Utc>) -> Result<usize> {
    let entries = backend
        .scan_prefix("")
        .map_err(|e| LoggerError::store_unavailable("persistence backend", e.to_string()))?;

    let mut restored = Vec::new();
    let mut stale = Vec::new();
    for (key, value) in entries {
        let Some((_, entry_index)) = parse_key(&key) else {
            continue;
        };
        if entry_index == RESERVED_INDEX || entry_index == NO_INDEX {
            tracing::warn!(key = %key, "discarding persisted entry with out-of-range index");
            stale.push(key);
            continue;
        }
        index.reserve_through(entry_index);
        match serde_json::from_slice::<StoredEntry>(&value) {
            Ok(entry) if !entry.is_expired(now) => {
                let mut event = entry.event;
                event.index = entry_index;
                restored.push(event);
            }
            Ok(_) => stale.push(key),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable persisted entry");
                stale.push(key);
            }
        }
    }

    for key in &stale {
        if let Err(e) = backend.delete(key) {
            tracing::warn!(key = %key, error = %e, "failed to delete stale entry");
        }
    }

    restored.sort_by_key(|event| event.index);
    let count = restored.len();
    for event in restored {
        index.insert_restored(event);
    }
    Ok(count)
}

impl Processor for LogStore {
    fn process(&self, event: &Event) -> Result<()> {
        if self.store(event.clone()) == NO_INDEX {
            return Err(LoggerError::processor("log_store", "index space exhausted"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log_store"
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "closing log store failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;
    use chrono::Duration as ChronoDuration;
    use std::time::Instant;

    fn event(level: LogLevel, correlation_id: &str, at: DateTime<Utc>) -> Event {
        Event::new(level, format!("{}@{}", correlation_id, at.timestamp_millis()))
            .with_correlation_id(correlation_id)
            .at(at)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_indices_are_strictly_increasing() {
        let store = LogStore::memory(StoreConfig::default()).unwrap();
        let a = store.store(Event::new(LogLevel::Info, "a"));
        let b = store.store(Event::new(LogLevel::Info, "b").with_correlation_id("r1"));
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn test_uncorrelated_events_only_in_timeline() {
        let store = LogStore::memory(StoreConfig::default()).unwrap();
        store.store(Event::new(LogLevel::Info, "loose"));

        assert!(store.get_correlation_ids().is_empty());
        assert!(store.get_by_correlation("").is_empty());
        assert_eq!(store.get_recent(10).len(), 1);
    }

    #[test]
    fn test_correlation_with_level() {
        let store = LogStore::memory(StoreConfig::default()).unwrap();
        let now = Utc::now();
        store.store(event(LogLevel::Debug, "r1", now));
        store.store(event(LogLevel::Error, "r1", now));
        store.store(event(LogLevel::Warn, "r1", now));

        let levels: Vec<LogLevel> = store
            .get_by_correlation_with_level("r1", LogLevel::Warn)
            .iter()
            .map(|e| e.level)
            .collect();
        assert_eq!(levels, vec![LogLevel::Error, LogLevel::Warn]);
        assert!(store.get_by_correlation_with_level("unknown", LogLevel::Trace).is_empty());
    }

    #[test]
    fn test_get_since_is_strict_and_ascending() {
        let store = LogStore::memory(StoreConfig::default()).unwrap();
        let base = Utc::now();
        for offset in [3, 1, 2, 0] {
            store.store(event(LogLevel::Info, "r", base + ChronoDuration::seconds(offset)));
        }

        let since: Vec<DateTime<Utc>> = store
            .get_since(base + ChronoDuration::seconds(1))
            .iter()
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(
            since,
            vec![base + ChronoDuration::seconds(2), base + ChronoDuration::seconds(3)]
        );
    }

    #[test]
    fn test_get_recent_breaks_ties_by_index() {
        let store = LogStore::memory(StoreConfig::default()).unwrap();
        let now = Utc::now();
        let first = store.store(event(LogLevel::Info, "r", now));
        let second = store.store(event(LogLevel::Info, "r", now));
        store.store(event(LogLevel::Info, "r", now - ChronoDuration::seconds(5)));

        let indices: Vec<u64> = store.get_recent(2).iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![second, first]);
        assert!(store.get_recent(0).is_empty());
    }

    #[test]
    fn test_eviction_removes_old_events_everywhere() {
        let store =
            LogStore::memory(StoreConfig::default().with_ttl(Duration::from_secs(60))).unwrap();
        let now = Utc::now();
        store.store(event(LogLevel::Info, "old", now - ChronoDuration::minutes(5)));
        store.store(event(LogLevel::Info, "mixed", now - ChronoDuration::minutes(5)));
        store.store(event(LogLevel::Info, "mixed", now));
        store.store(Event::new(LogLevel::Info, "loose").at(now - ChronoDuration::hours(1)));

        let report = store.evict_expired();
        assert_eq!(report.memory, 3);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get_correlation_ids().into_iter().collect::<Vec<_>>(),
            vec!["mixed".to_string()]
        );
        assert!(store.get_by_correlation("old").is_empty());
        assert_eq!(store.metrics().evicted(), 3);
    }

    #[test]
    fn test_write_behind_and_warm_restart() {
        let backend = Arc::new(MemoryKvStore::new());
        let now = Utc::now();
        {
            let store = LogStore::open(StoreConfig::default(), backend.clone()).unwrap();
            store.store(event(LogLevel::Info, "r1", now));
            store.store(Event::new(LogLevel::Warn, "loose").at(now));
            store.store(event(LogLevel::Error, "r1", now));
            assert!(wait_until(|| backend.len() == 3));
            store.close().unwrap();
        }
        assert!(backend.get(&persistence_key("", 2)).is_some());

        let restored = LogStore::open(StoreConfig::default(), backend.clone()).unwrap();
        assert_eq!(restored.get_by_correlation("r1").len(), 2);
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.store(Event::new(LogLevel::Info, "next")), 4);
    }

    #[test]
    fn test_restart_drops_expired_persisted_entries() {
        let backend = Arc::new(MemoryKvStore::new());
        let old = StoredEntry::new(
            event(LogLevel::Info, "r1", Utc::now() - ChronoDuration::hours(2)),
            Duration::from_secs(60),
        );
        backend
            .put(&persistence_key("r1", 7), &serde_json::to_vec(&old).unwrap())
            .unwrap();
        backend.put(&persistence_key("r1", 8), b"not json").unwrap();

        let store = LogStore::open(StoreConfig::default(), backend.clone()).unwrap();
        assert!(store.is_empty());
        assert!(backend.is_empty());
        // keys 7 and 8 existed, so they are never handed out again
        assert_eq!(store.store(Event::new(LogLevel::Info, "fresh")), 9);
    }

    #[test]
    fn test_restart_rejects_key_at_top_of_index_space() {
        let backend = Arc::new(MemoryKvStore::new());
        let entry = StoredEntry::new(event(LogLevel::Info, "r", Utc::now()), Duration::from_secs(60));
        backend
            .put(&persistence_key("r", u64::MAX), &serde_json::to_vec(&entry).unwrap())
            .unwrap();

        let store = LogStore::open(StoreConfig::default(), backend.clone()).unwrap();
        assert!(store.is_empty());
        assert!(backend.is_empty());
        assert_eq!(store.store(Event::new(LogLevel::Info, "after")), 1);
    }

    #[test]
    fn test_exhausted_index_space_drops_instead_of_wrapping() {
        let backend = Arc::new(MemoryKvStore::new());
        let entry = StoredEntry::new(event(LogLevel::Info, "r", Utc::now()), Duration::from_secs(60));
        backend
            .put(&persistence_key("r", u64::MAX - 1), &serde_json::to_vec(&entry).unwrap())
            .unwrap();

        let store = LogStore::open(StoreConfig::default(), backend).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.store(Event::new(LogLevel::Info, "one too many")), NO_INDEX);
        assert_eq!(store.store(Event::new(LogLevel::Info, "still none")), NO_INDEX);
        assert_eq!(store.len(), 1);
        assert!(store.process(&Event::new(LogLevel::Info, "via processor")).is_err());
        assert_eq!(store.metrics().stored(), 0);
    }

    #[test]
    fn test_eviction_deletes_persisted_entries() {
        let backend = Arc::new(MemoryKvStore::new());
        let store = LogStore::open(
            StoreConfig::default().with_ttl(Duration::from_secs(60)),
            backend.clone(),
        )
        .unwrap();
        store.store(event(LogLevel::Info, "r1", Utc::now() - ChronoDuration::minutes(10)));
        store.store(event(LogLevel::Info, "r1", Utc::now()));
        assert!(wait_until(|| backend.len() == 2));

        let report = store.evict_expired();
        assert_eq!(report, EvictionReport { memory: 1, persisted: 1 });
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_background_eviction() {
        let store = LogStore::memory(
            StoreConfig::default()
                .with_ttl(Duration::from_secs(1))
                .with_cleanup_interval(Duration::from_millis(10)),
        )
        .unwrap();
        store.store(event(LogLevel::Info, "r1", Utc::now() - ChronoDuration::minutes(1)));
        assert!(wait_until(|| store.is_empty()));
    }

    #[test]
    fn test_close_is_idempotent_and_keeps_memory() {
        let store = LogStore::memory(StoreConfig::default()).unwrap();
        store.store(event(LogLevel::Info, "r1", Utc::now()));
        store.close().unwrap();
        store.close().unwrap();
        assert_eq!(store.get_by_correlation("r1").len(), 1);
    }

    #[cfg(feature = "persistent")]
    #[test]
    fn test_unopenable_database_degrades_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let store = LogStore::new(
            StoreConfig::default().with_persistence_path(blocker.join("store.redb")),
        )
        .unwrap();
        assert!(!store.is_persistent());
        store.store(Event::new(LogLevel::Info, "still works"));
        assert_eq!(store.len(), 1);
    }
}
