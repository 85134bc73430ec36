//! Grid-side meter reading.

use serde::{Deserialize, Serialize};

use super::{DeviceClass, Reading, ensure_micro_precise, ensure_non_negative};
use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::time::{Timestamp, deserialize_micros, truncate_to_micros};

/// One sample from a grid-side meter: AC energy drawn and supply voltage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterReading {
    pub device_id: DeviceId,
    pub kwh_consumed_ac: f64,
    pub voltage: f64,
    /// Held at microsecond precision; finer input is truncated on parse.
    #[serde(deserialize_with = "deserialize_micros")]
    pub timestamp: Timestamp,
}

impl MeterReading {
    /// Create a builder for constructing a [`MeterReading`].
    #[must_use]
    pub fn builder() -> MeterReadingBuilder {
        MeterReadingBuilder::default()
    }
}

impl Reading for MeterReading {
    const CLASS: DeviceClass = DeviceClass::Meter;

    fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn energy_kwh(&self) -> f64 {
        self.kwh_consumed_ac
    }

    fn gauge(&self) -> f64 {
        self.voltage
    }

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_non_negative("kwhConsumedAc", self.kwh_consumed_ac)?;
        ensure_non_negative("voltage", self.voltage)?;
        ensure_micro_precise(self.timestamp)
    }
}

/// Step-by-step builder for [`MeterReading`].
#[derive(Debug, Default)]
pub struct MeterReadingBuilder {
    device_id: Option<String>,
    kwh_consumed_ac: f64,
    voltage: f64,
    timestamp: Option<Timestamp>,
}

impl MeterReadingBuilder {
    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn kwh_consumed_ac(mut self, kwh: f64) -> Self {
        self.kwh_consumed_ac = kwh;
        self
    }

    #[must_use]
    pub fn voltage(mut self, voltage: f64) -> Self {
        self.voltage = voltage;
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(truncate_to_micros(timestamp));
        self
    }

    /// Consume the builder, validate, and return a [`MeterReading`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the device id is missing or blank,
    /// or a numeric field is negative or not finite.
    pub fn build(self) -> Result<MeterReading, ValidationError> {
        let reading = MeterReading {
            device_id: DeviceId::new(self.device_id.unwrap_or_default())?,
            kwh_consumed_ac: self.kwh_consumed_ac,
            voltage: self.voltage,
            timestamp: self.timestamp.unwrap_or_else(crate::time::now),
        };
        reading.validate()?;
        Ok(reading)
    }
}
