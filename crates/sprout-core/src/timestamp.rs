//! Record timestamps and the ordering the sync engine relies on
//!
//! Every `updatedAt` value the server writes is an ISO-8601 UTC string with millisecond
//! precision (`2024-05-01T12:00:00.000Z`). Ordering is plain lexicographic comparison of
//! those strings, which is only a total order while every stamp keeps this exact
//! fixed-width format. Keep all comparisons behind [`is_newer`] so the representation can
//! change in one place.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An ISO-8601 "last modified" marker as stored in `updated_at` columns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Wrap a stored timestamp string without validation
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a client-supplied RFC 3339 timestamp into the canonical server format
    ///
    /// Offsets are converted to UTC and precision is fixed at milliseconds, so the result
    /// orders correctly against stored stamps.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let parsed = DateTime::parse_from_rfc3339(trimmed)
            .map_err(|e| Error::InvalidInput(format!("invalid timestamp {trimmed:?}: {e}")))?;
        Ok(Self::from_datetime(parsed.with_timezone(&Utc)))
    }

    /// Format a point in time in the canonical server format
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Current wall-clock time in the canonical server format
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decide whether `incoming` was written after `existing`
///
/// A missing `existing` stamp is infinitely old, so any incoming record wins against it.
/// A missing `incoming` stamp never wins against a present one. Equal stamps are not
/// newer: ties keep the server's copy.
pub fn is_newer(incoming: Option<&Timestamp>, existing: Option<&Timestamp>) -> bool {
    match (incoming, existing) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(incoming), Some(existing)) => incoming.as_str() > existing.as_str(),
    }
}

/// SQL predicate that holds exactly when `is_newer(incoming, <column>)` does
///
/// Returns the predicate text and the value to bind to its single `?` placeholder, if any.
pub(crate) fn older_than_sql(column: &str, incoming: Option<&Timestamp>) -> (String, Option<String>) {
    match incoming {
        Some(incoming) => (
            format!("({column} IS NULL OR {column} < ?)"),
            Some(incoming.as_str().to_string()),
        ),
        None => (format!("{column} IS NULL"), None),
    }
}

/// Source of server-side "now" used to stamp accepted writes and watermarks
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock for deterministic stamping in tests and tools
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// Create a clock frozen at the given RFC 3339 instant
    pub fn at(instant: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_rfc3339(instant)
            .map_err(|e| Error::InvalidInput(format!("invalid clock instant {instant:?}: {e}")))?;
        Ok(Self {
            millis: AtomicI64::new(parsed.timestamp_millis()),
        })
    }

    /// Move the clock to a new instant
    pub fn set(&self, instant: &str) -> Result<()> {
        let parsed = DateTime::parse_from_rfc3339(instant)
            .map_err(|e| Error::InvalidInput(format!("invalid clock instant {instant:?}: {e}")))?;
        self.millis
            .store(parsed.timestamp_millis(), Ordering::SeqCst);
        Ok(())
    }

    /// Advance the clock by the given number of milliseconds
    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        let millis = self.millis.load(Ordering::SeqCst);
        let at = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
        Timestamp::from_datetime(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(value: &str) -> Timestamp {
        Timestamp::from_stored(value)
    }

    #[test]
    fn test_strictly_later_is_newer() {
        let earlier = ts("2024-05-01T00:00:00.000Z");
        let later = ts("2024-05-02T00:00:00.000Z");
        assert!(is_newer(Some(&later), Some(&earlier)));
        assert!(!is_newer(Some(&earlier), Some(&later)));
    }

    #[test]
    fn test_equal_timestamps_favor_existing() {
        let stamp = ts("2024-05-01T00:00:00.000Z");
        assert!(!is_newer(Some(&stamp), Some(&stamp.clone())));
    }

    #[test]
    fn test_missing_existing_always_loses() {
        assert!(is_newer(Some(&ts("1970-01-01T00:00:00.000Z")), None));
        assert!(is_newer(None, None));
    }

    #[test]
    fn test_missing_incoming_never_wins() {
        assert!(!is_newer(None, Some(&ts("1970-01-01T00:00:00.000Z"))));
    }

    #[test]
    fn test_canonical_format_is_fixed_width() {
        let at = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            Timestamp::from_datetime(at).as_str(),
            "2024-01-02T03:04:05.000Z"
        );
        assert_eq!(Timestamp::now().as_str().len(), 24);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn test_parse_normalizes_to_canonical_utc() {
        assert_eq!(
            Timestamp::parse(" 2024-05-01T00:00:00Z ").unwrap().as_str(),
            "2024-05-01T00:00:00.000Z"
        );
        assert_eq!(
            Timestamp::parse("2024-05-02T04:00:00+05:00").unwrap().as_str(),
            "2024-05-01T23:00:00.000Z"
        );
        assert_eq!(
            Timestamp::parse("2024-05-01T00:00:00.123456Z").unwrap().as_str(),
            "2024-05-01T00:00:00.123Z"
        );

        // Raw text would sort "...00Z" after "...00.500Z"
        let seconds = Timestamp::parse("2024-05-02T00:00:00Z").unwrap();
        let stored = ts("2024-05-02T00:00:00.500Z");
        assert!(is_newer(Some(&stored), Some(&seconds)));
        assert!(!is_newer(Some(&seconds), Some(&stored)));
    }

    #[test]
    fn test_older_than_sql_matches_rule() {
        let (predicate, bind) = older_than_sql("updated_at", Some(&ts("2024-05-01T00:00:00Z")));
        assert_eq!(predicate, "(updated_at IS NULL OR updated_at < ?)");
        assert_eq!(bind.as_deref(), Some("2024-05-01T00:00:00Z"));

        let (predicate, bind) = older_than_sql("updated_at", None);
        assert_eq!(predicate, "updated_at IS NULL");
        assert!(bind.is_none());
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at("2024-06-01T00:00:00Z").unwrap();
        assert_eq!(clock.now().as_str(), "2024-06-01T00:00:00.000Z");

        clock.advance_millis(1_500);
        assert_eq!(clock.now().as_str(), "2024-06-01T00:00:01.500Z");

        clock.set("2025-01-01T00:00:00Z").unwrap();
        assert_eq!(clock.now().as_str(), "2025-01-01T00:00:00.000Z");
    }
}
