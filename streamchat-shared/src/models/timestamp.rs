use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Naive layouts the backend emits when a datetime has no offset attached.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// UTC instant used for message creation and persistence times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Parses RFC 3339 text, falling back to a naive ISO-8601 datetime read as UTC.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(Self(parsed.with_timezone(&Utc)));
        }

        NAIVE_FORMATS.iter().find_map(|format| {
            NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(|naive| Self(naive.and_utc()))
        })
    }

    /// Whether this instant lies within `window` of `now` (future instants count as recent).
    #[must_use]
    pub fn is_within(self, window: std::time::Duration, now: Self) -> bool {
        let Ok(window) = TimeDelta::from_std(window) else {
            return true;
        };
        now.0.signed_duration_since(self.0) <= window
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
