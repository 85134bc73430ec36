//! History: the append-only record of every applied reading.

use serde::{Deserialize, Serialize};

use crate::reading::{DataQuality, Reading};
use crate::time::Timestamp;

/// Identifier of a history row, unique across all partitions of one class.
pub type HistoryId = i64;

/// One immutable history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord<R> {
    pub id: HistoryId,
    #[serde(flatten)]
    pub reading: R,
    pub data_quality: DataQuality,
    pub created_at: Timestamp,
}

impl<R: Reading> HistoryRecord<R> {
    /// Create a fresh `valid` history row for `reading`.
    #[must_use]
    pub fn new(id: HistoryId, reading: R, created_at: Timestamp) -> Self {
        Self {
            id,
            reading,
            data_quality: DataQuality::Valid,
            created_at,
        }
    }
}
