//! Writer metrics for observability
//!
//! Lock-free counters tracking what happened to every event handed to a
//! writer or batch buffer (accepted into the queue, filtered by level,
//! dropped on overflow, processed, failed in the processor) and of what a
//! store did with its entries.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one ingestion component
///
/// # Example
///
/// ```
/// use log_distributor::WriterMetrics;
///
/// let metrics = WriterMetrics::new();
/// metrics.record_accepted();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.accepted(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct WriterMetrics {
    /// Events that made it into the queue or buffer
    accepted: AtomicU64,

    /// Events discarded by the minimum level filter
    filtered: AtomicU64,

    /// Events (or batch members) lost because the queue was full
    dropped_count: AtomicU64,

    /// Events the processor handled successfully
    processed: AtomicU64,

    /// Events the processor returned an error for or panicked on
    processor_failures: AtomicU64,
}

impl WriterMetrics {
    pub const fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            processor_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn processor_failures(&self) -> u64 {
        self.processor_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_accepted(&self) -> u64 {
        self.accepted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped event, returning the previous drop count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.record_dropped_many(1)
    }

    /// Record `count` dropped events at once (a whole batch)
    #[inline]
    pub fn record_dropped_many(&self, count: u64) -> u64 {
        self.dropped_count.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_processed(&self) -> u64 {
        self.record_processed_many(1)
    }

    #[inline]
    pub fn record_processed_many(&self, count: u64) -> u64 {
        self.processed.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_processor_failure(&self) -> u64 {
        self.processor_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of offered events lost to overflow, as a percentage
    ///
    /// Returns 0.0 if nothing has been offered yet.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.accepted() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.accepted.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
        self.processor_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for WriterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WriterMetrics {
    /// Create a snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            accepted: AtomicU64::new(self.accepted()),
            filtered: AtomicU64::new(self.filtered()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            processed: AtomicU64::new(self.processed()),
            processor_failures: AtomicU64::new(self.processor_failures()),
        }
    }
}

/// Counters of a [`LogStore`](crate::store::LogStore)
#[derive(Debug, Default)]
pub struct StoreMetrics {
    stored: AtomicU64,
    persisted: AtomicU64,
    /// Entries not persisted because the persistence queue was full
    persistence_skipped: AtomicU64,
    persistence_failures: AtomicU64,
    evicted: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> u64 {
        self.stored.load(Ordering::Relaxed)
    }

    pub fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::Relaxed)
    }

    pub fn persistence_skipped(&self) -> u64 {
        self.persistence_skipped.load(Ordering::Relaxed)
    }

    pub fn persistence_failures(&self) -> u64 {
        self.persistence_failures.load(Ordering::Relaxed)
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub(crate) fn record_stored(&self) -> u64 {
        self.stored.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn record_persisted(&self) -> u64 {
        self.persisted.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn record_persistence_skipped(&self) -> u64 {
        self.persistence_skipped.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn record_persistence_failure(&self) -> u64 {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn record_evicted(&self, count: u64) -> u64 {
        self.evicted.fetch_add(count, Ordering::Relaxed)
    }
}
