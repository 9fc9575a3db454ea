//! Event structure
//!
//! An [`Event`] is the unit that flows from producers through writers into
//! sinks and the [`LogStore`](crate::store::LogStore). Producers hand events
//! to writers as JSON payloads:
//!
//! ```json
//! {"level":"warn","time":"2025-01-08T10:30:45Z","correlation_id":"req-42",
//!  "prefix":"api","func":"handler","message":"slow upstream","latency_ms":812}
//! ```
//!
//! Keys other than the recognised ones end up in [`Event::fields`].

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Free-form key/value extension map of an event
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sequence number assigned by the store at insertion, 0 until stored
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(rename = "time", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(rename = "func", default, skip_serializing_if = "String::is_empty")]
    pub function: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Event {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            index: 0,
            level,
            timestamp: Utc::now(),
            correlation_id: String::new(),
            prefix: String::new(),
            function: String::new(),
            message: message.into(),
            error: String::new(),
            fields: Fields::new(),
        }
    }

    /// Decode a serialized event as handed to a writer.
    ///
    /// Any index carried by the payload is discarded; indices are only ever
    /// assigned by a store.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Err(LoggerError::parse("empty payload"));
        }
        let mut event: Event =
            serde_json::from_slice(payload).map_err(|e| LoggerError::parse(e.to_string()))?;
        event.index = 0;
        Ok(event)
    }

    /// Serialize as a single JSON line (without trailing newline)
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn to_json_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = id.into();
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Whether the event belongs to a correlation group
    #[inline]
    pub fn is_correlated(&self) -> bool {
        !self.correlation_id.is_empty()
    }
}

/// An event stamped with its expiry, as written to a persistent backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub event: Event,
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(event: Event, ttl: Duration) -> Self {
        let expires_at = add_duration(event.timestamp, ttl);
        Self { event, expires_at }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// `timestamp + duration`, saturating at the largest representable time
pub(crate) fn add_duration(timestamp: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| timestamp.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `timestamp - duration`, saturating at the smallest representable time
pub(crate) fn sub_duration(timestamp: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| timestamp.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_full_payload() {
        let payload = br#"{"level":"warn","time":"2025-01-08T10:30:45Z","correlation_id":"req-42",
            "prefix":"api","func":"handler","message":"slow upstream","error":"timeout",
            "latency_ms":812,"index":99}"#;
        let event = Event::from_payload(payload).unwrap();

        assert_eq!(event.index, 0);
        assert_eq!(event.level, LogLevel::Warn);
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap()
        );
        assert_eq!(event.correlation_id, "req-42");
        assert_eq!(event.function, "handler");
        assert_eq!(event.error, "timeout");
        assert_eq!(event.fields.get("latency_ms"), Some(&Value::from(812)));
        assert!(!event.fields.contains_key("index"));
    }

    #[test]
    fn test_parse_defaults() {
        let before = Utc::now();
        let event = Event::from_payload(b"{\"message\":\"hello\"}\n").unwrap();
        assert_eq!(event.level, LogLevel::Info);
        assert!(event.timestamp >= before);
        assert!(!event.is_correlated());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for payload in [
            &b""[..],
            b"   ",
            b"not json",
            b"[1,2,3]",
            b"{\"level\":\"loud\"}",
            b"{\"time\":\"yesterday\"}",
        ] {
            let err = Event::from_payload(payload).unwrap_err();
            assert!(matches!(err, LoggerError::Parse(_)), "payload {:?}", payload);
        }
    }

    #[test]
    fn test_payload_roundtrip_keeps_fields() {
        let event = Event::new(LogLevel::Error, "boom")
            .with_correlation_id("r1")
            .with_field("user", "alice");
        let parsed = Event::from_payload(&event.to_payload().unwrap()).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_stored_entry_expiry() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let entry = StoredEntry::new(Event::new(LogLevel::Info, "x").at(ts), Duration::from_secs(60));
        assert_eq!(entry.expires_at, ts + chrono::Duration::seconds(60));
        assert!(!entry.is_expired(ts + chrono::Duration::seconds(59)));
        assert!(entry.is_expired(ts + chrono::Duration::seconds(61)));
    }

    #[test]
    fn test_duration_arithmetic_saturates() {
        let ts = Utc::now();
        assert_eq!(add_duration(ts, Duration::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(sub_duration(ts, Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
