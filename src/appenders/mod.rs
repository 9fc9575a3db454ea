//! Output adapters that turn events into lines on a terminal or in a file

#[cfg(feature = "console")]
pub mod console;
pub mod file;

#[cfg(feature = "console")]
pub use console::ConsoleAppender;
pub use file::FileAppender;

pub use crate::core::Appender;

use crate::core::{Event, TimestampFormat};
use std::fmt::Write as _;

/// Render the single-line text form of an event
///
/// `[time] [LEVEL] prefix func: message (correlation_id) error=... key=value`
/// with every optional part left out when empty. Newlines inside the
/// message are escaped so one event is always one line.
pub(crate) fn render_line(event: &Event, time_format: &TimestampFormat, level: &str) -> String {
    let mut line = format!("[{}] [{}]", time_format.format(&event.timestamp), level);

    if !event.prefix.is_empty() {
        let _ = write!(line, " {}", event.prefix);
    }
    if !event.function.is_empty() {
        let _ = write!(line, " {}:", event.function);
    }
    let _ = write!(line, " {}", escape_newlines(&event.message));

    if event.is_correlated() {
        let _ = write!(line, " ({})", event.correlation_id);
    }
    if !event.error.is_empty() {
        let _ = write!(line, " error={}", escape_newlines(&event.error));
    }
    for (key, value) in &event.fields {
        let _ = write!(line, " {}={}", key, value);
    }
    line
}

fn escape_newlines(text: &str) -> std::borrow::Cow<'_, str> {
    if text.contains(['\n', '\r']) {
        text.replace('\r', "\\r").replace('\n', "\\n").into()
    } else {
        text.into()
    }
}
