//! Time windows and window aggregates.
//!
//! A [`TimeWindow`] is a closed interval `[start, end]`. Aggregation folds
//! every history row inside it into a [`WindowSums`] accumulator, which is
//! mergeable so partial sums from several partitions combine exactly as a
//! single scan would. Averages are only derived when the sums are turned
//! into a [`WindowAggregate`], never during accumulation.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::reading::{DeviceClass, Reading};
use crate::time::Timestamp;

/// Default analytics window, in hours.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    start: Timestamp,
    end: Timestamp,
}

impl TimeWindow {
    /// Build a window from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvertedWindow`] when `start > end`.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// The `hours` long window ending at `end`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidWindowHours`] for non-positive spans.
    pub fn trailing_hours(end: Timestamp, hours: i64) -> Result<Self, ValidationError> {
        if hours <= 0 {
            return Err(ValidationError::InvalidWindowHours(hours));
        }
        let span = Duration::try_hours(hours).ok_or(ValidationError::InvalidWindowHours(hours))?;
        let start = end
            .checked_sub_signed(span)
            .ok_or(ValidationError::InvalidWindowHours(hours))?;
        Self::new(start, end)
    }

    #[must_use]
    pub fn start(&self) -> Timestamp {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Whether `ts` falls inside the window, bounds included.
    #[must_use]
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// Every UTC calendar day the window touches, in ascending order.
    #[must_use]
    pub fn days(&self) -> Vec<NaiveDate> {
        let last = self.end.date_naive();
        self.start
            .date_naive()
            .iter_days()
            .take_while(|day| *day <= last)
            .collect()
    }
}

/// Mergeable running totals over a set of history rows.
///
/// `gauge_sum` accumulates voltage for meters and state of charge for
/// vehicles. Temperature is optional per row, so it keeps its own count.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSums {
    pub count: u64,
    pub energy_kwh: f64,
    pub gauge_sum: f64,
    pub temp_sum: f64,
    pub temp_count: u64,
}

impl WindowSums {
    /// Fold one reading into the totals.
    pub fn observe<R: Reading>(&mut self, reading: &R) {
        self.count += 1;
        self.energy_kwh += reading.energy_kwh();
        self.gauge_sum += reading.gauge();
        if let Some(temp) = reading.battery_temp_c() {
            self.temp_sum += temp;
            self.temp_count += 1;
        }
    }

    /// Combine totals computed over disjoint row sets.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            energy_kwh: self.energy_kwh + other.energy_kwh,
            gauge_sum: self.gauge_sum + other.gauge_sum,
            temp_sum: self.temp_sum + other.temp_sum,
            temp_count: self.temp_count + other.temp_count,
        }
    }

    /// Whether no row was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Turn the totals into an aggregate. Returns `None` for an empty window.
    #[must_use]
    pub fn finish(
        self,
        class: DeviceClass,
        device_id: Option<DeviceId>,
        window: TimeWindow,
    ) -> Option<WindowAggregate> {
        if self.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.count as f64;
        #[allow(clippy::cast_precision_loss)]
        let avg_battery_temp =
            (self.temp_count > 0).then(|| self.temp_sum / self.temp_count as f64);
        let metrics = match class {
            DeviceClass::Meter => AggregateMetrics::Meter {
                total_kwh_consumed_ac: self.energy_kwh,
                avg_voltage: self.gauge_sum / count,
            },
            DeviceClass::Vehicle => AggregateMetrics::Vehicle {
                total_kwh_delivered_dc: self.energy_kwh,
                avg_soc: self.gauge_sum / count,
                avg_battery_temp,
            },
        };
        Some(WindowAggregate {
            class,
            device_id,
            window,
            reading_count: self.count,
            metrics,
        })
    }
}

/// Class-specific figures of a [`WindowAggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum AggregateMetrics {
    #[serde(rename_all = "camelCase")]
    Meter {
        total_kwh_consumed_ac: f64,
        avg_voltage: f64,
    },
    #[serde(rename_all = "camelCase")]
    Vehicle {
        total_kwh_delivered_dc: f64,
        avg_soc: f64,
        avg_battery_temp: Option<f64>,
    },
}

/// Count, sums and averages over one window. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowAggregate {
    pub class: DeviceClass,
    /// `None` when the aggregate covers every device of the class.
    pub device_id: Option<DeviceId>,
    pub window: TimeWindow,
    pub reading_count: u64,
    pub metrics: AggregateMetrics,
}

impl WindowAggregate {
    /// Total energy over the window: AC for meters, DC for vehicles.
    #[must_use]
    pub fn total_energy_kwh(&self) -> f64 {
        match self.metrics {
            AggregateMetrics::Meter {
                total_kwh_consumed_ac,
                ..
            } => total_kwh_consumed_ac,
            AggregateMetrics::Vehicle {
                total_kwh_delivered_dc,
                ..
            } => total_kwh_delivered_dc,
        }
    }

    /// Mean battery temperature, for vehicle aggregates that saw one.
    #[must_use]
    pub fn avg_battery_temp(&self) -> Option<f64> {
        match self.metrics {
            AggregateMetrics::Vehicle {
                avg_battery_temp, ..
            } => avg_battery_temp,
            AggregateMetrics::Meter { .. } => None,
        }
    }
}
