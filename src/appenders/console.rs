//! Console appender implementation

use super::render_line;
use crate::core::{Appender, Event, LogLevel, Result, TimestampFormat};
use colored::{Color, Colorize};
use std::io::Write;

/// Terminal color of a level's tag
fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Trace => Color::BrightBlack,
        LogLevel::Debug => Color::Blue,
        LogLevel::Info => Color::Green,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Error => Color::Red,
        LogLevel::Fatal => Color::BrightRed,
        LogLevel::Panic => Color::Magenta,
    }
}

pub struct ConsoleAppender {
    use_colors: bool,
    timestamp_format: TimestampFormat,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            timestamp_format: TimestampFormat::default(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            timestamp_format: TimestampFormat::default(),
        }
    }

    /// Set the timestamp format for this appender
    ///
    /// # Examples
    ///
    /// ```
    /// use log_distributor::appenders::ConsoleAppender;
    /// use log_distributor::TimestampFormat;
    ///
    /// let appender = ConsoleAppender::new()
    ///     .with_timestamp_format(TimestampFormat::Iso8601Micros);
    /// ```
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    fn format_line(&self, event: &Event) -> String {
        let padded = format!("{:5}", event.level.to_str());
        let level = if self.use_colors {
            padded.color(level_color(event.level)).to_string()
        } else {
            padded
        };
        render_line(event, &self.timestamp_format, &level)
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, event: &Event) -> Result<()> {
        let line = self.format_line(event);

        // Error and above go to stderr
        if event.level >= LogLevel::Error {
            writeln!(std::io::stderr().lock(), "{}", line)?;
        } else {
            writeln!(std::io::stdout().lock(), "{}", line)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
