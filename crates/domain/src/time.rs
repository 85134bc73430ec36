//! Time and timestamp helpers.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer};

/// UTC timestamp used for reading times, `created_at`, `updated_at`, window bounds.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time, at storage precision.
#[must_use]
pub fn now() -> Timestamp {
    truncate_to_micros(Utc::now())
}

/// Drop the sub-microsecond part of `ts`, which storage cannot hold.
#[must_use]
pub fn truncate_to_micros(ts: Timestamp) -> Timestamp {
    ts.trunc_subsecs(6)
}

/// Whether `ts` survives a trip through [`to_micros`] unchanged.
#[must_use]
pub fn is_micro_precise(ts: Timestamp) -> bool {
    ts.timestamp_subsec_nanos() % 1_000 == 0
}

/// Serde helper: parse a timestamp and truncate it to microseconds.
///
/// # Errors
///
/// Returns the deserializer's error when the value is not a timestamp.
pub fn deserialize_micros<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    Timestamp::deserialize(deserializer).map(truncate_to_micros)
}

/// Convert a timestamp into microseconds since the Unix epoch.
///
/// This is the storage representation: integers keep range predicates and
/// the `(device_id, ts)` ordering index exact.
#[must_use]
pub fn to_micros(ts: Timestamp) -> i64 {
    ts.timestamp_micros()
}

/// Inverse of [`to_micros`]. Returns `None` when out of the representable range.
#[must_use]
pub fn from_micros(micros: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_micros(micros)
}
