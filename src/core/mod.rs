//! Core types and capability traits shared by every component

pub mod appender;
pub mod config;
pub mod error;
pub mod event;
pub mod log_level;
pub mod metrics;
pub mod overflow;
pub mod processor;
pub mod shutdown;
pub mod timestamp;
pub mod writer;

pub use appender::Appender;
pub use config::{BatchConfig, BroadcastConfig, StoreConfig, WriterConfig};
pub use error::{LoggerError, Result};
pub use event::{Event, Fields, StoredEntry};
pub use log_level::LogLevel;
pub use metrics::{StoreMetrics, WriterMetrics};
pub use overflow::OverflowCallback;
pub use processor::{AppenderSet, Processor};
pub use shutdown::ShutdownTrigger;
pub use timestamp::TimestampFormat;
pub use writer::LogWriter;
