//! Factory map from writer kind to constructor
//!
//! Hosts wire pipelines by name (`"console"`, `"file"`, or any kind they
//! register) instead of switching over concrete writer types.

use super::async_writer::AsyncWriter;
#[cfg(feature = "console")]
use crate::appenders::ConsoleAppender;
use crate::appenders::FileAppender;
use crate::core::{
    error::{LoggerError, Result},
    AppenderSet, LogWriter, WriterConfig,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a writer from its configuration
pub type WriterFactory = Box<dyn Fn(&WriterConfig) -> Result<Box<dyn LogWriter>> + Send + Sync>;

/// Registry of writer factories
///
/// # Example
///
/// ```
/// use log_distributor::prelude::*;
/// use log_distributor::writers::WriterRegistry;
/// use std::sync::Arc;
///
/// let store = Arc::new(LogStore::new(StoreConfig::default()).unwrap());
/// let mut registry = WriterRegistry::with_defaults();
/// let shared = store.clone();
/// registry.register("memory", move |config: &WriterConfig| {
///     let writer = AsyncWriter::spawn(config.clone(), shared.clone())?;
///     Ok(Box::new(writer) as Box<dyn LogWriter>)
/// });
///
/// let writer = registry.create("memory", &WriterConfig::new("memory")).unwrap();
/// writer.write(br#"{"message":"hello"}"#).unwrap();
/// assert!(registry.create("redis", &WriterConfig::new("r")).is_err());
/// ```
pub struct WriterRegistry {
    factories: HashMap<String, WriterFactory>,
}

impl WriterRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in `console` and `file` kinds
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        #[cfg(feature = "console")]
        registry.register("console", console_writer);
        registry.register("file", file_writer);
        registry
    }

    /// Register (or replace) the factory for `kind`
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&WriterConfig) -> Result<Box<dyn LogWriter>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Build a writer of `kind`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for an unknown kind; otherwise whatever the
    /// factory reports.
    pub fn create(&self, kind: &str, config: &WriterConfig) -> Result<Box<dyn LogWriter>> {
        let factory = self.factories.get(kind).ok_or_else(|| {
            LoggerError::config("WriterRegistry", format!("unknown writer kind '{}'", kind))
        })?;
        factory(config)
    }
}

impl Default for WriterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(feature = "console")]
fn console_writer(config: &WriterConfig) -> Result<Box<dyn LogWriter>> {
    let appender = ConsoleAppender::new()
        .with_timestamp_format(config.time_format.clone().unwrap_or_default());
    let processor = AppenderSet::new(config.name.clone()).with_appender(appender);
    Ok(Box::new(AsyncWriter::spawn(config.clone(), Arc::new(processor))?))
}

fn file_writer(config: &WriterConfig) -> Result<Box<dyn LogWriter>> {
    let path = config
        .path
        .as_ref()
        .ok_or_else(|| LoggerError::config("file writer", "missing `path`"))?;
    let appender = FileAppender::new(path)?
        .with_timestamp_format(config.time_format.clone().unwrap_or_default());
    let processor = AppenderSet::new(config.name.clone()).with_appender(appender);
    Ok(Box::new(AsyncWriter::spawn(config.clone(), Arc::new(processor))?))
}
