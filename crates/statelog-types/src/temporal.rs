use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Text layout used for persisted timestamps.
///
/// Fixed width with microsecond precision and a `Z` suffix, so the lexical
/// order of the text equals the chronological order of the instants.
const ISO_8601_MICROS: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// UTC instant at which a history entry was recorded.
///
/// Held at microsecond precision: the value read back from storage is
/// identical to the value written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(6))
    }

    /// Timestamp for a new entry appended after `last`.
    ///
    /// Wall-clock time normally, but never earlier than `last`: a clock that
    /// steps backwards must not produce a history whose timestamps decrease
    /// as change ids increase.
    pub fn next_after(last: Option<Timestamp>) -> Self {
        let now = Self::now();
        match last {
            Some(previous) if previous > now => previous,
            _ => now,
        }
    }

    /// Parse an RFC 3339 / ISO-8601 timestamp, normalizing to UTC.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| TypeError::InvalidTimestamp {
                value: value.to_owned(),
                reason: e.to_string(),
            })
    }

    /// Fixed-width ISO-8601 text, e.g. `2024-05-01T12:00:00.000000Z`.
    pub fn to_iso8601(&self) -> String {
        self.0.format(ISO_8601_MICROS).to_string()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_iso8601())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64, micros: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.timestamp_opt(secs, micros * 1_000).unwrap())
    }

    #[test]
    fn iso_text_is_fixed_width() {
        let ts = at(1_700_000_000, 0);
        assert_eq!(ts.to_iso8601(), "2023-11-14T22:13:20.000000Z");
        assert_eq!(at(1_700_000_000, 42).to_iso8601().len(), ts.to_iso8601().len());
    }

    #[test]
    fn text_order_matches_time_order() {
        let a = at(1_700_000_000, 999_999);
        let b = at(1_700_000_001, 0);
        assert!(a < b);
        assert!(a.to_iso8601() < b.to_iso8601());
    }

    #[test]
    fn parse_roundtrips_persisted_text() {
        let ts = at(1_700_000_000, 123_456);
        assert_eq!(Timestamp::parse(&ts.to_iso8601()).unwrap(), ts);
    }

    #[test]
    fn parse_normalizes_offsets() {
        let ts = Timestamp::parse("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(ts.to_iso8601(), "2024-01-01T00:00:00.000000Z");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(TypeError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn next_after_never_goes_backwards() {
        let future = Timestamp::from_datetime(Utc::now() + Duration::hours(1));
        assert_eq!(Timestamp::next_after(Some(future)), future);

        let past = at(1_000, 0);
        assert!(Timestamp::next_after(Some(past)) > past);
        assert!(Timestamp::next_after(None) > past);
    }

    #[test]
    fn serde_uses_iso_text() {
        let ts = at(1_700_000_000, 5);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2023-11-14T22:13:20.000005Z\"");
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ts);
    }
}
