//! Efficiency classification.
//!
//! The efficiency ratio is delivered (DC) energy over source (AC) energy.
//! A window with no source energy yields a ratio of `0`, which is a valid,
//! reportable state rather than an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest ratio still classified as [`HealthTier::Healthy`].
pub const HEALTHY_MIN_RATIO: f64 = 0.85;

/// Lowest ratio still classified as [`HealthTier::Degraded`].
pub const DEGRADED_MIN_RATIO: f64 = 0.75;

/// Decimal places used when presenting ratios.
pub const RATIO_DECIMALS: u32 = 4;

/// Decimal places used when presenting energies.
pub const ENERGY_DECIMALS: u32 = 3;

/// Decimal places used when presenting temperatures.
pub const TEMPERATURE_DECIMALS: u32 = 2;

/// Charging-path health derived from the efficiency ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTier {
    Healthy,
    Degraded,
    Critical,
}

impl fmt::Display for HealthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Degraded => f.write_str("degraded"),
            Self::Critical => f.write_str("critical"),
        }
    }
}

/// Tier boundaries, evaluated from the top down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyThresholds {
    pub healthy: f64,
    pub degraded: f64,
}

impl Default for EfficiencyThresholds {
    fn default() -> Self {
        Self {
            healthy: HEALTHY_MIN_RATIO,
            degraded: DEGRADED_MIN_RATIO,
        }
    }
}

impl EfficiencyThresholds {
    /// Build thresholds, checking `0 <= degraded <= healthy <= 1`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeOrNonFinite`] when a bound is out of range.
    pub fn new(healthy: f64, degraded: f64) -> Result<Self, ValidationError> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(healthy) {
            return Err(ValidationError::NegativeOrNonFinite {
                field: "healthyThreshold",
                value: healthy,
            });
        }
        if !in_unit(degraded) || degraded > healthy {
            return Err(ValidationError::NegativeOrNonFinite {
                field: "degradedThreshold",
                value: degraded,
            });
        }
        Ok(Self { healthy, degraded })
    }

    /// Map a ratio onto a tier.
    #[must_use]
    pub fn tier(&self, ratio: f64) -> HealthTier {
        if ratio >= self.healthy {
            HealthTier::Healthy
        } else if ratio >= self.degraded {
            HealthTier::Degraded
        } else {
            HealthTier::Critical
        }
    }

    /// Compute the ratio and its tier from source and delivered energy.
    #[must_use]
    pub fn classify(&self, source_kwh: f64, delivered_kwh: f64) -> (f64, HealthTier) {
        let ratio = efficiency_ratio(source_kwh, delivered_kwh);
        (ratio, self.tier(ratio))
    }
}

/// `delivered / source`, or `0` when there is no source energy.
#[must_use]
pub fn efficiency_ratio(source_kwh: f64, delivered_kwh: f64) -> f64 {
    if source_kwh > 0.0 {
        delivered_kwh / source_kwh
    } else {
        0.0
    }
}

/// Classify with the default thresholds.
#[must_use]
pub fn classify(source_kwh: f64, delivered_kwh: f64) -> (f64, HealthTier) {
    EfficiencyThresholds::default().classify(source_kwh, delivered_kwh)
}

/// Round half away from zero to `decimals` places. Presentation only.
#[must_use]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}
