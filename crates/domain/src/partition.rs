//! History partitions.
//!
//! History is physically split into one partition per device class and UTC
//! calendar day. Partition names are derived from the day alone, so the
//! lifecycle manager can compute the next partition to create without
//! looking at the ones that already exist.

use std::fmt;

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::reading::DeviceClass;
use crate::time::Timestamp;

/// Identifies the partition holding one class's readings for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub class: DeviceClass,
    pub date: NaiveDate,
}

impl PartitionKey {
    #[must_use]
    pub fn new(class: DeviceClass, date: NaiveDate) -> Self {
        Self { class, date }
    }

    /// The partition a reading taken at `ts` belongs to.
    #[must_use]
    pub fn for_timestamp(class: DeviceClass, ts: Timestamp) -> Self {
        Self::new(class, ts.date_naive())
    }

    /// Deterministic physical name, e.g. `meter_history_p20250115`.
    #[must_use]
    pub fn table_name(&self) -> String {
        format!(
            "{}_history_p{}",
            self.class.as_str(),
            self.date.format("%Y%m%d")
        )
    }

    /// First instant covered (inclusive).
    #[must_use]
    pub fn range_start(&self) -> Timestamp {
        self.date.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant of the following day (exclusive).
    #[must_use]
    pub fn range_end(&self) -> Timestamp {
        self.next().range_start()
    }

    /// The partition for the following day.
    #[must_use]
    pub fn next(&self) -> Self {
        Self::new(
            self.class,
            self.date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX),
        )
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table_name())
    }
}

/// Outcome of ensuring a partition exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionOutcome {
    Created,
    AlreadyExists,
}

/// A partition removed from the active set; its rows live on under `archived_as`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detached {
    pub key: PartitionKey,
    pub archived_as: String,
}

/// Catalog entry describing one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub key: PartitionKey,
    pub table_name: String,
    pub range_start: Timestamp,
    pub range_end: Timestamp,
    pub created_at: Timestamp,
    pub retired_at: Option<Timestamp>,
}

impl PartitionInfo {
    /// Whether writes and scans may use this partition.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.retired_at.is_none()
    }
}
