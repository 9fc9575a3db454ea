//! Appender trait for log output destinations

use super::{error::Result, event::Event};

/// A formatting/output destination (console, file, ...).
///
/// Appenders are driven from a single consumer thread; wrap them in an
/// [`AppenderSet`](super::processor::AppenderSet) to use them as a writer's
/// processor.
pub trait Appender: Send {
    fn append(&mut self, event: &Event) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
