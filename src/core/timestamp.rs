//! Timestamp layouts used by the output appenders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an appender renders an event's timestamp.
///
/// Parsing from a config string accepts the variant names case-insensitively
/// (`"rfc3339"`, `"unix_millis"`, ...); any other string containing `%` is
/// treated as a strftime layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,
    /// `2025-01-08T10:30:45.123456Z`
    Iso8601Micros,
    /// `2025-01-08T10:30:45+00:00`
    Rfc3339,
    /// Seconds since the epoch
    Unix,
    UnixMillis,
    /// Custom strftime layout
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Iso8601Micros => datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(layout) => datetime.format(layout).to_string(),
        }
    }
}

impl FromStr for TimestampFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "iso8601" => Ok(TimestampFormat::Iso8601),
            "iso8601_micros" => Ok(TimestampFormat::Iso8601Micros),
            "rfc3339" => Ok(TimestampFormat::Rfc3339),
            "unix" => Ok(TimestampFormat::Unix),
            "unix_millis" => Ok(TimestampFormat::UnixMillis),
            _ if s.contains('%') => Ok(TimestampFormat::Custom(s.to_string())),
            _ => Err(format!("Invalid timestamp format: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_datetime() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::microseconds(123456)
    }

    #[test]
    fn test_iso8601_formats() {
        assert_eq!(
            TimestampFormat::Iso8601.format(&fixed_datetime()),
            "2025-01-08T10:30:45.123Z"
        );
        assert_eq!(
            TimestampFormat::Iso8601Micros.format(&fixed_datetime()),
            "2025-01-08T10:30:45.123456Z"
        );
    }

    #[test]
    fn test_numeric_formats() {
        let secs: i64 = TimestampFormat::Unix.format(&fixed_datetime()).parse().unwrap();
        let millis: i64 = TimestampFormat::UnixMillis
            .format(&fixed_datetime())
            .parse()
            .unwrap();
        assert_eq!(millis / 1000, secs);
    }

    #[test]
    fn test_custom_format() {
        let format = TimestampFormat::Custom("%d/%b/%Y:%H:%M:%S".to_string());
        assert_eq!(format.format(&fixed_datetime()), "08/Jan/2025:10:30:45");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("RFC3339".parse::<TimestampFormat>(), Ok(TimestampFormat::Rfc3339));
        assert_eq!("unix-millis".parse::<TimestampFormat>(), Ok(TimestampFormat::UnixMillis));
        assert_eq!(
            "%H:%M".parse::<TimestampFormat>(),
            Ok(TimestampFormat::Custom("%H:%M".to_string()))
        );
        assert!("sometime".parse::<TimestampFormat>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TimestampFormat::UnixMillis).unwrap();
        assert_eq!(json, "\"unix_millis\"");
        let parsed: TimestampFormat = serde_json::from_str(r#"{"custom":"%Y"}"#).unwrap();
        assert_eq!(parsed, TimestampFormat::Custom("%Y".to_string()));
    }
}
