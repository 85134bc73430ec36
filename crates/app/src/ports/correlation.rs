//! Device correlation port: which meter supplies a given vehicle.
//!
//! Reports combine a vehicle's delivered energy with the source energy of
//! "its" meter. Without an explicit mapping the source side falls back to
//! every meter in the fleet, which overstates source energy whenever more
//! than one meter reports in the window. Keeping the lookup behind a trait
//! lets an explicit mapping replace that approximation without touching
//! the aggregation code.

use std::collections::HashMap;

use chargewatch_domain::id::DeviceId;

/// Resolves the meter correlated with a vehicle.
pub trait DeviceCorrelation {
    /// The meter feeding `vehicle_id`, or `None` to aggregate fleet-wide.
    fn meter_for(&self, vehicle_id: &DeviceId) -> Option<DeviceId>;
}

/// No mapping: every vehicle is compared against the whole meter fleet.
#[derive(Debug, Clone, Copy, Default)]
pub struct FleetWide;

impl DeviceCorrelation for FleetWide {
    fn meter_for(&self, _vehicle_id: &DeviceId) -> Option<DeviceId> {
        None
    }
}

/// Fixed vehicle → meter table, typically loaded from configuration.
/// Unmapped vehicles fall back to fleet-wide aggregation.
#[derive(Debug, Clone, Default)]
pub struct StaticCorrelation {
    pairs: HashMap<DeviceId, DeviceId>,
}

impl StaticCorrelation {
    #[must_use]
    pub fn new(pairs: HashMap<DeviceId, DeviceId>) -> Self {
        Self { pairs }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl DeviceCorrelation for StaticCorrelation {
    fn meter_for(&self, vehicle_id: &DeviceId) -> Option<DeviceId> {
        self.pairs.get(vehicle_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> DeviceId {
        DeviceId::new(raw).unwrap()
    }

    #[test]
    fn should_never_correlate_when_fleet_wide() {
        assert!(FleetWide.meter_for(&id("EV-1")).is_none());
    }

    #[test]
    fn should_resolve_mapped_vehicle_and_fall_back_otherwise() {
        let correlation =
            StaticCorrelation::new(HashMap::from([(id("EV-1"), id("METER-9"))]));

        assert_eq!(correlation.meter_for(&id("EV-1")), Some(id("METER-9")));
        assert!(correlation.meter_for(&id("EV-2")).is_none());
        assert_eq!(correlation.len(), 1);
    }
}
