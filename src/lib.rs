//! # Log Distributor
//!
//! Pluggable, non-blocking distribution of structured log events.
//!
//! Producers hand events to writers; the library routes them to sinks
//! without ever blocking the caller, while applying severity filtering,
//! batching, correlation indexing and TTL eviction.
//!
//! ## Components
//!
//! - **[`AsyncWriter`]**: bounded queue plus one consumer thread in front of
//!   a [`Processor`]; drops on overflow, drains on stop
//! - **[`BatchBuffer`]**: size/time triggered batches handed to a channel
//! - **[`LogStore`]**: correlation- and timeline-indexed record of recent
//!   events with TTL eviction and optional write-behind persistence
//! - **[`BroadcastDistributor`]**: polls a store and pushes new events to
//!   live subscribers
//!
//! ```
//! use log_distributor::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
//! let writer = AsyncWriter::spawn(WriterConfig::new("memory"), store.clone()).unwrap();
//!
//! writer
//!     .write(br#"{"level":"error","correlation_id":"req-1","message":"boom"}"#)
//!     .unwrap();
//! writer.stop().unwrap();
//!
//! assert_eq!(store.get_recent(1)[0].message, "boom");
//! ```

pub mod appenders;
pub mod broadcast;
pub mod core;
pub mod macros;
pub mod store;
pub mod writers;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::appenders::ConsoleAppender;
    pub use crate::appenders::FileAppender;
    pub use crate::broadcast::{
        BroadcastDistributor, ChannelSubscriber, ClientId, EventSource, Subscriber,
    };
    pub use crate::core::{
        Appender, AppenderSet, BatchConfig, BroadcastConfig, Event, LogLevel, LogWriter,
        LoggerError, OverflowCallback, Processor, Result, StoreConfig, TimestampFormat,
        WriterConfig,
    };
    pub use crate::store::{KeyValueStore, LogStore, MemoryKvStore};
    pub use crate::writers::{AsyncWriter, BatchBuffer, WriterRegistry};
}

pub use crate::broadcast::{BroadcastDistributor, EventSource, Subscriber};
pub use crate::core::{
    Appender, AppenderSet, BatchConfig, BroadcastConfig, Event, Fields, LogLevel, LogWriter,
    LoggerError, OverflowCallback, Processor, Result, ShutdownTrigger, StoreConfig, StoreMetrics,
    StoredEntry, TimestampFormat, WriterConfig, WriterMetrics,
};
pub use crate::store::{KeyValueStore, LogStore};
pub use crate::writers::{AsyncWriter, BatchBuffer, WriterRegistry};
