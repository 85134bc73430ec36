//! Current status: the latest applied reading per device.

use serde::{Deserialize, Serialize};

use crate::reading::{DataQuality, Reading};
use crate::time::Timestamp;

/// The mutable "latest state" row kept for every device id.
///
/// `reading` holds the values of the most recently *applied* reading, so
/// `reading.timestamp` is the row's last-update timestamp. `created_at` is
/// set on the first reading for the id and never changes afterwards;
/// `updated_at` advances on every applied reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus<R> {
    #[serde(flatten)]
    pub reading: R,
    pub data_quality: DataQuality,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl<R: Reading> CurrentStatus<R> {
    /// Timestamp of the most recently applied reading.
    #[must_use]
    pub fn last_update(&self) -> Timestamp {
        self.reading.timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::MeterReading;
    use crate::time::now;

    #[test]
    fn should_expose_reading_timestamp_as_last_update() {
        let ts = now() - chrono::Duration::minutes(5);
        let status = CurrentStatus {
            reading: MeterReading::builder()
                .device_id("METER-001")
                .voltage(230.0)
                .timestamp(ts)
                .build()
                .unwrap(),
            data_quality: DataQuality::Valid,
            created_at: now(),
            updated_at: now(),
        };
        assert_eq!(status.last_update(), ts);
    }

    #[test]
    fn should_flatten_reading_fields_when_serialized() {
        let status = CurrentStatus {
            reading: MeterReading::builder()
                .device_id("METER-001")
                .voltage(230.0)
                .build()
                .unwrap(),
            data_quality: DataQuality::Valid,
            created_at: now(),
            updated_at: now(),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["deviceId"], "METER-001");
        assert_eq!(value["dataQuality"], "valid");
    }
}
