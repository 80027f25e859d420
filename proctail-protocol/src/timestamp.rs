//! UTC timestamp wrapper with wire-stable RFC3339 (millisecond, `Z`-suffixed) serialization.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A UTC timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] rather than re-exporting it directly so
/// the wire format (`"2025-01-01T12:34:56.789Z"`, millisecond precision,
/// literal `Z`) is controlled here instead of depending on chrono's
/// default `+00:00` offset rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

/// Truncates to millisecond precision so the in-memory value always equals
/// what a round trip through the wire format would produce.
fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or(dt)
}

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Timestamp(truncate_to_millis(Utc::now()))
    }

    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(truncate_to_millis(dt))
    }

    #[must_use]
    pub fn inner(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::from_datetime(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let dt = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| D::Error::custom(format!("invalid RFC3339 timestamp: {e}")))?;
        Ok(Timestamp(dt.with_timezone(&Utc)))
    }
}
