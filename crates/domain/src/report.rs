//! Performance report: efficiency of one vehicle's charging path.
//!
//! The vehicle stream and the meter stream are aggregated independently
//! over the same window and only combined here. The two sides are not
//! symmetric:
//!
//! - no vehicle rows in the window means there is nothing to report, and
//!   the caller gets a not-found error before a report is ever assembled;
//! - no meter rows in the window is reportable: source energy is `0`, so
//!   the ratio is `0` and the tier is [`HealthTier::Critical`].

use serde::{Deserialize, Serialize};

use crate::efficiency::{
    ENERGY_DECIMALS, EfficiencyThresholds, HealthTier, RATIO_DECIMALS, TEMPERATURE_DECIMALS,
    round_to,
};
use crate::id::DeviceId;
use crate::time::Timestamp;
use crate::window::{TimeWindow, WindowAggregate};

/// Presentation-ready efficiency report. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub vehicle_id: DeviceId,
    /// Meter the source energy was taken from; `None` when summed fleet-wide.
    pub meter_id: Option<DeviceId>,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub total_kwh_consumed_ac: f64,
    pub total_kwh_delivered_dc: f64,
    pub efficiency_ratio: f64,
    pub avg_battery_temp: Option<f64>,
    /// Vehicle readings in the window.
    pub reading_count: u64,
    pub meter_reading_count: u64,
    pub health_status: HealthTier,
}

impl PerformanceReport {
    /// Combine a vehicle aggregate and an optional meter aggregate.
    ///
    /// Classification runs on the unrounded ratio; every figure is rounded
    /// only once, when it is copied into the report.
    #[must_use]
    pub fn assemble(
        vehicle_id: DeviceId,
        meter_id: Option<DeviceId>,
        window: TimeWindow,
        vehicle: &WindowAggregate,
        meter: Option<&WindowAggregate>,
        thresholds: &EfficiencyThresholds,
    ) -> Self {
        let delivered = vehicle.total_energy_kwh();
        let source = meter.map_or(0.0, WindowAggregate::total_energy_kwh);
        let (ratio, tier) = thresholds.classify(source, delivered);

        Self {
            vehicle_id,
            meter_id,
            window_start: window.start(),
            window_end: window.end(),
            total_kwh_consumed_ac: round_to(source, ENERGY_DECIMALS),
            total_kwh_delivered_dc: round_to(delivered, ENERGY_DECIMALS),
            efficiency_ratio: round_to(ratio, RATIO_DECIMALS),
            avg_battery_temp: vehicle
                .avg_battery_temp()
                .map(|t| round_to(t, TEMPERATURE_DECIMALS)),
            reading_count: vehicle.reading_count,
            meter_reading_count: meter.map_or(0, |m| m.reading_count),
            health_status: tier,
        }
    }
}
