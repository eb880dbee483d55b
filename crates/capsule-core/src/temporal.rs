//! # Temporal Types -- UTC Timestamps
//!
//! Manifests carry `createdAt`/`updatedAt` as ISO8601 strings in UTC with a
//! `Z` suffix and millisecond precision (`2026-01-15T12:00:00.000Z`), the form
//! every existing manifest already uses.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// A UTC timestamp truncated to millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Wrap a `DateTime<Utc>`, truncating below milliseconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        match DateTime::from_timestamp_millis(dt.timestamp_millis()) {
            Some(truncated) => Self(truncated),
            None => Self(dt),
        }
    }

    /// Parse an RFC 3339 string. Any offset is accepted and converted to UTC.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s.trim()).map_err(|e| CoreError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO8601 with millisecond precision and `Z` suffix.
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_millis_with_z_suffix() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:00:00.000Z");
    }

    #[test]
    fn converts_offsets_to_utc() {
        let ts = Timestamp::parse("2026-01-15T17:30:00.250+05:30").unwrap();
        assert_eq!(ts.to_string(), "2026-01-15T12:00:00.250Z");
    }

    #[test]
    fn truncates_below_millis() {
        let ts = Timestamp::parse("2026-01-15T12:00:00.123456789Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:00:00.123Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn serde_round_trips_through_string() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
