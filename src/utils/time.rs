//! Time utilities

use chrono::{DateTime, Utc};

/// Get current UTC time
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a datetime string in ISO 8601 format
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Whole minutes elapsed from `start` to `at`, truncated toward zero
pub fn minutes_between(start: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (at - start).num_minutes()
}

/// Convert fractional seconds reported by the executor to whole milliseconds
pub fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0) as i64
}
