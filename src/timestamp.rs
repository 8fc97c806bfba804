//! Timestamp coercion.
//!
//! Exports carry instants as epoch seconds (integer or float), epoch
//! milliseconds, ISO-8601 strings, or not at all. The unit of a numeric
//! value is decided by the field it came from ([`TimeUnit`]), never by its
//! magnitude. Missing or unparseable values fall back to the instant held
//! by a [`BatchClock`], which is read once per load so that every defaulted
//! timestamp in a batch is identical.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Unit of a numeric timestamp, keyed off the source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// `create_time` / `update_time` in tree-mapping exports.
    Seconds,
    /// `timestamp` / `startDate` style fields written from JS `Date` values.
    Millis,
}

/// The ingestion instant for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchClock {
    now: DateTime<Utc>,
}

impl BatchClock {
    /// Read the system clock once.
    pub fn start() -> Self {
        Self { now: Utc::now() }
    }

    /// A clock pinned to a given instant.
    pub fn fixed(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

impl Default for BatchClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Parse a candidate value, returning `None` when it cannot be interpreted.
pub fn parse_instant(value: Option<&Value>, unit: TimeUnit) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => from_epoch(n.as_f64()?, unit),
        Value::String(s) => parse_str(s, unit),
        _ => None,
    }
}

/// Coerce a candidate value into an instant, defaulting to the batch clock.
pub fn normalize_time(value: Option<&Value>, unit: TimeUnit, clock: &BatchClock) -> DateTime<Utc> {
    parse_instant(value, unit).unwrap_or_else(|| clock.now())
}

fn from_epoch(raw: f64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }
    let millis = match unit {
        TimeUnit::Seconds => raw * 1000.0,
        TimeUnit::Millis => raw,
    };
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64)
}

fn parse_str(raw: &str, unit: TimeUnit) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Zone-less ISO forms are read as UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
    }
    // Numbers serialized as strings keep the field's unit.
    s.parse::<f64>().ok().and_then(|n| from_epoch(n, unit))
}
