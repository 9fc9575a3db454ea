//! Configuration consumed by the writers, the store and the distributor
//!
//! Configuration is plain data: hosts build it in code with the `with_*`
//! setters or deserialize it (e.g. [`StoreConfig::from_json`]). Zero
//! durations and sizes mean "use the default" and are replaced by
//! `normalized()` when a component is constructed.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_BATCH_OUTPUT_CAPACITY: usize = 16;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_PERSISTENCE_QUEUE: usize = 1000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

fn from_json<T: serde::de::DeserializeOwned>(component: &str, json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| LoggerError::config(component, e.to_string()))
}

/// Configuration of a single writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Writer name, used in diagnostics
    pub name: String,
    pub min_level: LogLevel,
    pub queue_capacity: usize,
    /// Timestamp layout used by output appenders
    pub time_format: Option<TimestampFormat>,
    /// Destination file for file-backed writers
    pub path: Option<PathBuf>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            name: "writer".to_string(),
            min_level: LogLevel::Info,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            time_format: None,
            path: None,
        }
    }
}

impl WriterConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        from_json("WriterConfig", json)
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_time_format(mut self, format: TimestampFormat) -> Self {
        self.time_format = Some(format);
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.queue_capacity == 0 {
            self.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        self
    }
}

/// Configuration of a [`BatchBuffer`](crate::writers::BatchBuffer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub name: String,
    pub min_level: LogLevel,
    /// Flush as soon as this many events are buffered
    pub batch_size: usize,
    /// Flush at least this often while events are buffered
    pub flush_interval: Duration,
    /// How long a flush may wait for room in the output channel
    pub delivery_timeout: Duration,
    /// Capacity of the channel created by `BatchBuffer::channel`
    pub output_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            name: "batch".to_string(),
            min_level: LogLevel::Info,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            output_capacity: DEFAULT_BATCH_OUTPUT_CAPACITY,
        }
    }
}

impl BatchConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        from_json("BatchConfig", json)
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    #[must_use]
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.batch_size == 0 {
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
        if self.flush_interval.is_zero() {
            self.flush_interval = DEFAULT_FLUSH_INTERVAL;
        }
        if self.delivery_timeout.is_zero() {
            self.delivery_timeout = DEFAULT_DELIVERY_TIMEOUT;
        }
        if self.output_capacity == 0 {
            self.output_capacity = DEFAULT_BATCH_OUTPUT_CAPACITY;
        }
        self
    }
}

/// Configuration of a [`LogStore`](crate::store::LogStore)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub ttl: Duration,
    pub cleanup_interval: Duration,
    /// Journal location for write-behind persistence; `None` keeps the
    /// store memory-only
    pub persistence_path: Option<PathBuf>,
    pub persistence_queue: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            persistence_path: None,
            persistence_queue: DEFAULT_PERSISTENCE_QUEUE,
        }
    }
}

impl StoreConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        from_json("StoreConfig", json)
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    #[must_use]
    pub fn with_persistence_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistence_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_persistence_queue(mut self, capacity: usize) -> Self {
        self.persistence_queue = capacity;
        self
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.ttl.is_zero() {
            self.ttl = DEFAULT_TTL;
        }
        if self.cleanup_interval.is_zero() {
            self.cleanup_interval = DEFAULT_CLEANUP_INTERVAL;
        }
        if self.persistence_queue == 0 {
            self.persistence_queue = DEFAULT_PERSISTENCE_QUEUE;
        }
        self
    }
}

/// Configuration of a [`BroadcastDistributor`](crate::broadcast::BroadcastDistributor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub min_level: LogLevel,
    pub poll_interval: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl BroadcastConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        from_json("BroadcastConfig", json)
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        self
    }
}
