//! Readings: one telemetry sample reported by a device.
//!
//! Two device populations report independently: grid-side meters
//! ([`MeterReading`]) and vehicle-side chargers ([`VehicleReading`]). Both
//! flow through the same write and aggregation algorithms; the [`Reading`]
//! trait is the seam that lets those algorithms stay class-agnostic.

mod meter;
mod quality;
mod vehicle;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use meter::{MeterReading, MeterReadingBuilder};
pub use quality::{DataQuality, UnknownDataQuality};
pub use vehicle::{VehicleReading, VehicleReadingBuilder};

use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::time::Timestamp;

/// Which device population a reading, status row or history row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Meter,
    Vehicle,
}

impl DeviceClass {
    /// Every class, in a stable order.
    pub const ALL: [Self; 2] = [Self::Meter, Self::Vehicle];

    /// Lowercase name, also used as the storage prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meter => "meter",
            Self::Vehicle => "vehicle",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meter" | "meters" => Ok(Self::Meter),
            "vehicle" | "vehicles" => Ok(Self::Vehicle),
            other => Err(ValidationError::UnknownDeviceClass(other.to_string())),
        }
    }
}

/// Behaviour shared by every reading class.
///
/// `energy_kwh` and `gauge` are the two numeric fields the window
/// aggregator sums: AC energy and voltage for meters, DC energy and state
/// of charge for vehicles.
pub trait Reading: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Device population this reading belongs to.
    const CLASS: DeviceClass;

    /// Reporting device.
    fn device_id(&self) -> &DeviceId;

    /// Instant the device took the sample.
    fn timestamp(&self) -> Timestamp;

    /// Energy counter for the reporting interval, in kWh.
    fn energy_kwh(&self) -> f64;

    /// Level-type measurement averaged over a window.
    fn gauge(&self) -> f64;

    /// Battery temperature, when the device reports one.
    fn battery_temp_c(&self) -> Option<f64> {
        None
    }

    /// Check range invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Keep only the last reading per device id, preserving the order in which
/// each surviving reading appeared.
///
/// A bulk upsert sees each device id at most once; within one unit of work
/// the reading applied last wins, matching what sequential single writes
/// would leave behind.
#[must_use]
pub fn last_per_device<R: Reading>(readings: &[R]) -> Vec<&R> {
    let mut last_index = std::collections::HashMap::with_capacity(readings.len());
    for (idx, reading) in readings.iter().enumerate() {
        last_index.insert(reading.device_id(), idx);
    }
    readings
        .iter()
        .enumerate()
        .filter(|(idx, reading)| last_index.get(reading.device_id()) == Some(idx))
        .map(|(_, reading)| reading)
        .collect()
}

pub(crate) fn ensure_micro_precise(timestamp: Timestamp) -> Result<(), ValidationError> {
    if crate::time::is_micro_precise(timestamp) {
        Ok(())
    } else {
        Err(ValidationError::SubMicrosecondTimestamp(
            timestamp.to_rfc3339(),
        ))
    }
}

pub(crate) fn ensure_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NegativeOrNonFinite { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_singular_and_plural_class_names() {
        assert_eq!("meter".parse::<DeviceClass>().unwrap(), DeviceClass::Meter);
        assert_eq!("vehicles".parse::<DeviceClass>().unwrap(), DeviceClass::Vehicle);
        assert!("charger".parse::<DeviceClass>().is_err());
    }

    #[test]
    fn should_serialize_class_lowercase() {
        let json = serde_json::to_string(&DeviceClass::Vehicle).unwrap();
        assert_eq!(json, "\"vehicle\"");
    }

    #[test]
    fn should_keep_last_reading_per_device() {
        let meter = |id: &str, kwh: f64| {
            MeterReading::builder()
                .device_id(id)
                .kwh_consumed_ac(kwh)
                .voltage(230.0)
                .build()
                .unwrap()
        };
        let readings = vec![
            meter("A", 1.0),
            meter("B", 2.0),
            meter("A", 3.0),
            meter("C", 4.0),
            meter("B", 5.0),
        ];

        let kept: Vec<f64> = last_per_device(&readings)
            .iter()
            .map(|r| r.kwh_consumed_ac)
            .collect();
        assert_eq!(kept, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn should_reject_negative_and_non_finite_values() {
        assert!(ensure_non_negative("voltage", 0.0).is_ok());
        assert!(ensure_non_negative("voltage", -0.1).is_err());
        assert!(ensure_non_negative("voltage", f64::NAN).is_err());
        assert!(ensure_non_negative("voltage", f64::INFINITY).is_err());
    }
}
