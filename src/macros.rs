//! Macros for emitting events with `format!`-style messages.
//!
//! The target is anything with a `log(Event)` method, i.e. an
//! [`AsyncWriter`](crate::writers::AsyncWriter) or a
//! [`BatchBuffer`](crate::writers::BatchBuffer).
//!
//! # Examples
//!
//! ```
//! use log_distributor::prelude::*;
//! use log_distributor::{info, warn};
//!
//! let (buffer, batches) = BatchBuffer::channel(BatchConfig::default()).unwrap();
//!
//! // Basic logging
//! info!(buffer, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(buffer, "Server listening on port {}", port);
//!
//! // Grouped under a correlation id
//! warn!(buffer, correlation_id = "req-7"; "upstream took {} ms", 812);
//!
//! buffer.stop();
//! assert_eq!(batches.recv().unwrap().len(), 3);
//! ```

/// Emit an event at an explicit level.
///
/// # Examples
///
/// ```
/// # use log_distributor::prelude::*;
/// # let (buffer, _batches) = BatchBuffer::channel(BatchConfig::default()).unwrap();
/// use log_distributor::log;
/// log!(buffer, LogLevel::Info, "Simple message");
/// log!(buffer, LogLevel::Error, "Error code: {}", 500);
/// log!(buffer, LogLevel::Warn, correlation_id = "req-1"; "slow request");
/// ```
#[macro_export]
macro_rules! log {
    ($target:expr, $level:expr, correlation_id = $id:expr; $($arg:tt)+) => {
        $target.log($crate::Event::new($level, format!($($arg)+)).with_correlation_id($id))
    };
    ($target:expr, $level:expr, $($arg:tt)+) => {
        $target.log($crate::Event::new($level, format!($($arg)+)))
    };
}

/// Emit a trace-level event.
#[macro_export]
macro_rules! trace {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Emit a debug-level event.
#[macro_export]
macro_rules! debug {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Emit an info-level event.
#[macro_export]
macro_rules! info {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Emit a warning-level event.
#[macro_export]
macro_rules! warn {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Emit an error-level event.
///
/// # Examples
///
/// ```
/// # use log_distributor::prelude::*;
/// # let (buffer, _batches) = BatchBuffer::channel(BatchConfig::default()).unwrap();
/// use log_distributor::error;
/// error!(buffer, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Emit a fatal-level event.
#[macro_export]
macro_rules! fatal {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::LogLevel::Fatal, $($arg)+)
    };
}
