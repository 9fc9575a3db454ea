//! Write-side capability shared by every ingestion component

use super::{error::Result, log_level::LogLevel};

/// A sink that accepts serialized events.
///
/// `write` decodes the payload and returns the number of bytes accepted.
/// Only a malformed payload is reported as an error: level filtering,
/// queue overflow and a stopped writer all report success.
pub trait LogWriter: Send + Sync {
    fn write(&self, payload: &[u8]) -> Result<usize>;

    /// Replace the minimum level; applies to every subsequent write
    fn set_min_level(&self, level: LogLevel);

    fn min_level(&self) -> LogLevel;

    fn name(&self) -> &str;

    /// Chaining form of [`LogWriter::set_min_level`]
    fn with_level(&self, level: LogLevel) -> &Self
    where
        Self: Sized,
    {
        self.set_min_level(level);
        self
    }
}
