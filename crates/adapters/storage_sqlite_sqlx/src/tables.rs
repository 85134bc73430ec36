//! Column layout of each reading class.
//!
//! Status and history tables share the same measurement columns; only the
//! surrounding bookkeeping differs. Everything here is a compile-time
//! constant, so identifiers spliced into SQL never come from input.

use std::str::FromStr;

use sqlx::query_builder::Separated;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};

use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::{DataQuality, DeviceClass, MeterReading, Reading, VehicleReading};
use chargewatch_domain::time::{Timestamp, from_micros};

use crate::error::decode_error;

/// Storage mapping of one reading class.
pub trait ReadingTable: Reading + Unpin {
    /// Current-status table, keyed by `device_id`.
    const STATUS_TABLE: &'static str;
    /// Measurement columns, in the order [`push_measurements`](Self::push_measurements) binds them.
    const MEASUREMENTS: &'static [&'static str];
    /// Column summed as energy by window scans.
    const ENERGY_COLUMN: &'static str;
    /// Column averaged as the gauge by window scans.
    const GAUGE_COLUMN: &'static str;
    /// Nullable temperature column, if the class has one.
    const TEMP_COLUMN: Option<&'static str>;

    /// Bind the measurement values of `self`.
    fn push_measurements(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>);

    /// Rebuild a reading from a status or history row.
    fn decode(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

impl ReadingTable for MeterReading {
    const STATUS_TABLE: &'static str = "meter_status";
    const MEASUREMENTS: &'static [&'static str] = &["kwh_consumed_ac", "voltage"];
    const ENERGY_COLUMN: &'static str = "kwh_consumed_ac";
    const GAUGE_COLUMN: &'static str = "voltage";
    const TEMP_COLUMN: Option<&'static str> = None;

    fn push_measurements(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.kwh_consumed_ac).push_bind(self.voltage);
    }

    fn decode(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            device_id: decode_device_id(row)?,
            kwh_consumed_ac: row.try_get("kwh_consumed_ac")?,
            voltage: row.try_get("voltage")?,
            timestamp: decode_micros(row, "ts")?,
        })
    }
}

impl ReadingTable for VehicleReading {
    const STATUS_TABLE: &'static str = "vehicle_status";
    const MEASUREMENTS: &'static [&'static str] = &["soc", "kwh_delivered_dc", "battery_temp"];
    const ENERGY_COLUMN: &'static str = "kwh_delivered_dc";
    const GAUGE_COLUMN: &'static str = "soc";
    const TEMP_COLUMN: Option<&'static str> = Some("battery_temp");

    fn push_measurements(&self, row: &mut Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.soc)
            .push_bind(self.kwh_delivered_dc)
            .push_bind(self.battery_temp);
    }

    fn decode(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            device_id: decode_device_id(row)?,
            soc: row.try_get("soc")?,
            kwh_delivered_dc: row.try_get("kwh_delivered_dc")?,
            battery_temp: row.try_get("battery_temp")?,
            timestamp: decode_micros(row, "ts")?,
        })
    }
}

/// Measurement column definitions used when creating a history partition.
pub(crate) fn history_measurement_defs(class: DeviceClass) -> &'static str {
    match class {
        DeviceClass::Meter => "kwh_consumed_ac REAL NOT NULL, voltage REAL NOT NULL",
        DeviceClass::Vehicle => {
            "soc REAL NOT NULL, kwh_delivered_dc REAL NOT NULL, battery_temp REAL"
        }
    }
}

pub(crate) fn decode_device_id(row: &SqliteRow) -> Result<DeviceId, sqlx::Error> {
    let raw: String = row.try_get("device_id")?;
    DeviceId::new(raw).map_err(decode_error)
}

pub(crate) fn decode_micros(row: &SqliteRow, column: &str) -> Result<Timestamp, sqlx::Error> {
    let micros: i64 = row.try_get(column)?;
    from_micros(micros).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("timestamp out of range: {micros}").into(),
    })
}

pub(crate) fn decode_quality(row: &SqliteRow) -> Result<DataQuality, sqlx::Error> {
    let raw: String = row.try_get("data_quality")?;
    DataQuality::from_str(&raw).map_err(decode_error)
}
