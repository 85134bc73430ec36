//! Vehicle-side charger reading.

use serde::{Deserialize, Serialize};

use super::{DeviceClass, Reading, ensure_micro_precise, ensure_non_negative};
use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::time::{Timestamp, deserialize_micros, truncate_to_micros};

/// One sample from a vehicle charger: DC energy delivered, battery state of
/// charge and, when the vehicle reports it, battery temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleReading {
    pub device_id: DeviceId,
    pub soc: f64,
    pub kwh_delivered_dc: f64,
    #[serde(default)]
    pub battery_temp: Option<f64>,
    /// Held at microsecond precision; finer input is truncated on parse.
    #[serde(deserialize_with = "deserialize_micros")]
    pub timestamp: Timestamp,
}

impl VehicleReading {
    /// Create a builder for constructing a [`VehicleReading`].
    #[must_use]
    pub fn builder() -> VehicleReadingBuilder {
        VehicleReadingBuilder::default()
    }
}

impl Reading for VehicleReading {
    const CLASS: DeviceClass = DeviceClass::Vehicle;

    fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn energy_kwh(&self) -> f64 {
        self.kwh_delivered_dc
    }

    fn gauge(&self) -> f64 {
        self.soc
    }

    fn battery_temp_c(&self) -> Option<f64> {
        self.battery_temp
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=100.0).contains(&self.soc) {
            return Err(ValidationError::StateOfChargeOutOfRange(self.soc));
        }
        ensure_non_negative("kwhDeliveredDc", self.kwh_delivered_dc)?;
        if let Some(temp) = self.battery_temp {
            if !temp.is_finite() {
                return Err(ValidationError::NonFiniteTemperature(temp));
            }
        }
        ensure_micro_precise(self.timestamp)
    }
}

/// Step-by-step builder for [`VehicleReading`].
#[derive(Debug, Default)]
pub struct VehicleReadingBuilder {
    device_id: Option<String>,
    soc: f64,
    kwh_delivered_dc: f64,
    battery_temp: Option<f64>,
    timestamp: Option<Timestamp>,
}

impl VehicleReadingBuilder {
    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn soc(mut self, soc: f64) -> Self {
        self.soc = soc;
        self
    }

    #[must_use]
    pub fn kwh_delivered_dc(mut self, kwh: f64) -> Self {
        self.kwh_delivered_dc = kwh;
        self
    }

    #[must_use]
    pub fn battery_temp(mut self, temp: f64) -> Self {
        self.battery_temp = Some(temp);
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(truncate_to_micros(timestamp));
        self
    }

    /// Consume the builder, validate, and return a [`VehicleReading`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] on a blank device id, a state of charge
    /// outside `0..=100`, negative energy or a non-finite temperature.
    pub fn build(self) -> Result<VehicleReading, ValidationError> {
        let reading = VehicleReading {
            device_id: DeviceId::new(self.device_id.unwrap_or_default())?,
            soc: self.soc,
            kwh_delivered_dc: self.kwh_delivered_dc,
            battery_temp: self.battery_temp,
            timestamp: self.timestamp.unwrap_or_else(crate::time::now),
        };
        reading.validate()?;
        Ok(reading)
    }
}
