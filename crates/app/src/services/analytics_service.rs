//! Analytics service: window aggregates and performance reports.

use std::time::{Duration, Instant};

use chargewatch_domain::efficiency::EfficiencyThresholds;
use chargewatch_domain::error::{ChargeWatchError, NotFoundError};
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::DeviceClass;
use chargewatch_domain::report::PerformanceReport;
use chargewatch_domain::time::now;
use chargewatch_domain::window::{DEFAULT_WINDOW_HOURS, TimeWindow, WindowAggregate};

use crate::deadline;
use crate::ports::{DeviceCorrelation, WindowScanner};

/// Maximum execution time of one window scan.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Tuning knobs for [`AnalyticsService`].
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsSettings {
    pub scan_timeout: Duration,
    pub default_window_hours: i64,
    pub thresholds: EfficiencyThresholds,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            default_window_hours: DEFAULT_WINDOW_HOURS,
            thresholds: EfficiencyThresholds::default(),
        }
    }
}

/// Application service answering aggregate and efficiency queries.
pub struct AnalyticsService<W, C> {
    scanner: W,
    correlation: C,
    settings: AnalyticsSettings,
}

impl<W, C> AnalyticsService<W, C>
where
    W: WindowScanner,
    C: DeviceCorrelation,
{
    /// Create a new service reading history through `scanner`.
    pub fn new(scanner: W, correlation: C, settings: AnalyticsSettings) -> Self {
        Self {
            scanner,
            correlation,
            settings,
        }
    }

    /// Count, sums and averages over `window`, for one device or the whole class.
    ///
    /// # Errors
    ///
    /// Returns [`ChargeWatchError::NotFound`] when no row matches, or
    /// [`ChargeWatchError::Transient`] when the scan exceeds its deadline.
    #[tracing::instrument(skip(self, window), fields(start = %window.start(), end = %window.end()))]
    pub async fn aggregate(
        &self,
        class: DeviceClass,
        device_id: Option<&DeviceId>,
        window: TimeWindow,
    ) -> Result<WindowAggregate, ChargeWatchError> {
        self.try_aggregate(class, device_id, window)
            .await?
            .ok_or_else(|| {
                NotFoundError {
                    entity: match class {
                        DeviceClass::Meter => "MeterHistory",
                        DeviceClass::Vehicle => "VehicleHistory",
                    },
                    id: device_id.map_or_else(|| "*".to_string(), ToString::to_string),
                }
                .into()
            })
    }

    /// Performance of `vehicle_id` over the trailing `window_hours` (default
    /// from settings) ending now.
    ///
    /// # Errors
    ///
    /// See [`performance`](Self::performance); additionally a validation
    /// error for a non-positive `window_hours`.
    pub async fn get_performance(
        &self,
        vehicle_id: &DeviceId,
        window_hours: Option<i64>,
        meter_id: Option<DeviceId>,
    ) -> Result<PerformanceReport, ChargeWatchError> {
        let hours = window_hours.unwrap_or(self.settings.default_window_hours);
        let window = TimeWindow::trailing_hours(now(), hours)?;
        self.performance(vehicle_id, window, meter_id).await
    }

    /// Performance of `vehicle_id` over an explicit window.
    ///
    /// The meter side is chosen in this order: the caller's `meter_id`, the
    /// injected correlation, and otherwise every meter of the fleet.
    ///
    /// # Errors
    ///
    /// Returns [`ChargeWatchError::NotFound`] when the vehicle has no
    /// history in the window. A meter side without rows is not an error: the
    /// report then carries zero source energy and a critical tier.
    #[tracing::instrument(skip(self, window), fields(start = %window.start(), end = %window.end()))]
    pub async fn performance(
        &self,
        vehicle_id: &DeviceId,
        window: TimeWindow,
        meter_id: Option<DeviceId>,
    ) -> Result<PerformanceReport, ChargeWatchError> {
        let vehicle = self
            .aggregate(DeviceClass::Vehicle, Some(vehicle_id), window)
            .await?;

        let meter_id = meter_id.or_else(|| self.correlation.meter_for(vehicle_id));
        if meter_id.is_none() {
            tracing::debug!("no correlated meter, using fleet-wide meter energy");
        }
        let meter = self
            .try_aggregate(DeviceClass::Meter, meter_id.as_ref(), window)
            .await?;

        let report = PerformanceReport::assemble(
            vehicle_id.clone(),
            meter_id,
            window,
            &vehicle,
            meter.as_ref(),
            &self.settings.thresholds,
        );
        tracing::info!(
            ratio = report.efficiency_ratio,
            tier = %report.health_status,
            reading_count = report.reading_count,
            "performance computed"
        );
        Ok(report)
    }

    async fn try_aggregate(
        &self,
        class: DeviceClass,
        device_id: Option<&DeviceId>,
        window: TimeWindow,
    ) -> Result<Option<WindowAggregate>, ChargeWatchError> {
        let started = Instant::now();
        let scan = deadline::within(
            "window scan",
            self.settings.scan_timeout,
            self.scanner.scan(class, device_id, window),
        )
        .await
        .inspect_err(|err| {
            tracing::warn!(error = %err, %class, "window scan failed");
        })?;

        tracing::debug!(
            %class,
            rows = scan.sums.count,
            partitions = scan.partitions_scanned,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "window scanned"
        );

        Ok(scan.sums.finish(class, device_id.cloned(), window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FleetWide, ScanResult, StaticCorrelation};
    use chargewatch_domain::efficiency::HealthTier;
    use chargewatch_domain::reading::{MeterReading, Reading, VehicleReading};
    use chargewatch_domain::time::Timestamp;
    use chargewatch_domain::window::WindowSums;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryHistory {
        meters: Vec<MeterReading>,
        vehicles: Vec<VehicleReading>,
        scans: Mutex<Vec<(DeviceClass, Option<String>)>>,
    }

    fn fold<R: Reading>(rows: &[R], device_id: Option<&DeviceId>, window: TimeWindow) -> WindowSums {
        let mut sums = WindowSums::default();
        rows.iter()
            .filter(|r| window.contains(r.timestamp()))
            .filter(|r| device_id.is_none_or(|id| r.device_id() == id))
            .for_each(|r| sums.observe(r));
        sums
    }

    impl WindowScanner for InMemoryHistory {
        async fn scan(
            &self,
            class: DeviceClass,
            device_id: Option<&DeviceId>,
            window: TimeWindow,
        ) -> Result<ScanResult, ChargeWatchError> {
            self.scans
                .lock()
                .unwrap()
                .push((class, device_id.map(ToString::to_string)));
            let sums = match class {
                DeviceClass::Meter => fold(&self.meters, device_id, window),
                DeviceClass::Vehicle => fold(&self.vehicles, device_id, window),
            };
            Ok(ScanResult {
                sums,
                partitions_scanned: window.days().len(),
            })
        }
    }

    fn at(value: &str) -> Timestamp {
        chrono::DateTime::parse_from_rfc3339(value).unwrap().to_utc()
    }

    fn id(raw: &str) -> DeviceId {
        DeviceId::new(raw).unwrap()
    }

    fn meter(device: &str, kwh: f64, ts: Timestamp) -> MeterReading {
        MeterReading::builder()
            .device_id(device)
            .kwh_consumed_ac(kwh)
            .voltage(240.5)
            .timestamp(ts)
            .build()
            .unwrap()
    }

    fn vehicle(device: &str, kwh: f64, ts: Timestamp) -> VehicleReading {
        VehicleReading::builder()
            .device_id(device)
            .soc(85.5)
            .kwh_delivered_dc(kwh)
            .battery_temp(35.2)
            .timestamp(ts)
            .build()
            .unwrap()
    }

    fn window_ending(end: &str) -> TimeWindow {
        TimeWindow::trailing_hours(at(end), 24).unwrap()
    }

    #[tokio::test]
    async fn should_build_healthy_report_for_reference_scenario() {
        let t = at("2025-01-15T10:00:00Z");
        let history = InMemoryHistory {
            meters: vec![meter("METER-001", 125.456, t)],
            vehicles: vec![vehicle("EV-001", 106.638, t)],
            ..InMemoryHistory::default()
        };
        let svc = AnalyticsService::new(history, FleetWide, AnalyticsSettings::default());

        let report = svc
            .performance(&id("EV-001"), window_ending("2025-01-15T10:00:00Z"), None)
            .await
            .unwrap();

        assert!((report.total_kwh_consumed_ac - 125.456).abs() < 1e-12);
        assert!((report.total_kwh_delivered_dc - 106.638).abs() < 1e-12);
        assert!((report.efficiency_ratio - 0.85).abs() < 1e-12);
        assert_eq!(report.avg_battery_temp, Some(35.2));
        assert_eq!(report.health_status, HealthTier::Healthy);
        assert_eq!(report.reading_count, 1);
    }

    #[tokio::test]
    async fn should_return_not_found_without_vehicle_history() {
        let t = at("2025-01-15T10:00:00Z");
        let history = InMemoryHistory {
            meters: vec![meter("METER-001", 125.456, t)],
            vehicles: vec![vehicle("EV-001", 10.0, t)],
            ..InMemoryHistory::default()
        };
        let svc = AnalyticsService::new(history, FleetWide, AnalyticsSettings::default());

        let err = svc
            .performance(&id("EV-404"), window_ending("2025-01-15T10:00:00Z"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ChargeWatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_report_critical_instead_of_failing_without_meter_history() {
        let t = at("2025-01-15T10:00:00Z");
        let history = InMemoryHistory {
            vehicles: vec![vehicle("EV-001", 106.638, t)],
            ..InMemoryHistory::default()
        };
        let svc = AnalyticsService::new(history, FleetWide, AnalyticsSettings::default());

        let report = svc
            .performance(&id("EV-001"), window_ending("2025-01-15T10:00:00Z"), None)
            .await
            .unwrap();

        assert!(report.total_kwh_consumed_ac.abs() < f64::EPSILON);
        assert!(report.efficiency_ratio.abs() < f64::EPSILON);
        assert_eq!(report.health_status, HealthTier::Critical);
    }

    #[tokio::test]
    async fn should_sum_whole_fleet_when_no_meter_is_correlated() {
        let t = at("2025-01-15T10:00:00Z");
        let history = InMemoryHistory {
            meters: vec![meter("METER-A", 60.0, t), meter("METER-B", 60.0, t)],
            vehicles: vec![vehicle("EV-001", 51.0, t)],
            ..InMemoryHistory::default()
        };
        let svc = AnalyticsService::new(history, FleetWide, AnalyticsSettings::default());

        let report = svc
            .performance(&id("EV-001"), window_ending("2025-01-15T10:00:00Z"), None)
            .await
            .unwrap();

        assert!((report.total_kwh_consumed_ac - 120.0).abs() < 1e-9);
        assert!(report.meter_id.is_none());
        assert_eq!(report.health_status, HealthTier::Critical);
    }

    #[tokio::test]
    async fn should_prefer_caller_meter_over_correlation() {
        let t = at("2025-01-15T10:00:00Z");
        let history = InMemoryHistory {
            meters: vec![meter("METER-A", 60.0, t), meter("METER-B", 100.0, t)],
            vehicles: vec![vehicle("EV-001", 51.0, t)],
            ..InMemoryHistory::default()
        };
        let correlation =
            StaticCorrelation::new(HashMap::from([(id("EV-001"), id("METER-B"))]));
        let svc = AnalyticsService::new(history, correlation, AnalyticsSettings::default());
        let window = window_ending("2025-01-15T10:00:00Z");

        let correlated = svc.performance(&id("EV-001"), window, None).await.unwrap();
        assert_eq!(correlated.meter_id, Some(id("METER-B")));
        assert!((correlated.total_kwh_consumed_ac - 100.0).abs() < 1e-9);

        let hinted = svc
            .performance(&id("EV-001"), window, Some(id("METER-A")))
            .await
            .unwrap();
        assert_eq!(hinted.meter_id, Some(id("METER-A")));
        assert!((hinted.efficiency_ratio - 0.85).abs() < 1e-12);
        assert_eq!(hinted.health_status, HealthTier::Healthy);
    }

    #[tokio::test]
    async fn should_scan_both_streams_over_the_same_window() {
        let t = at("2025-01-15T10:00:00Z");
        let history = InMemoryHistory {
            vehicles: vec![vehicle("EV-001", 1.0, t)],
            ..InMemoryHistory::default()
        };
        let svc = AnalyticsService::new(history, FleetWide, AnalyticsSettings::default());

        svc.performance(&id("EV-001"), window_ending("2025-01-15T10:00:00Z"), None)
            .await
            .unwrap();

        let scans = svc.scanner.scans.lock().unwrap();
        assert_eq!(
            *scans,
            vec![
                (DeviceClass::Vehicle, Some("EV-001".to_string())),
                (DeviceClass::Meter, None),
            ]
        );
    }

    #[tokio::test]
    async fn should_return_identical_aggregates_on_repeated_calls() {
        let base = at("2025-01-15T00:00:00Z");
        let meters = (0..50)
            .map(|i| meter("METER-001", 0.1 * f64::from(i), base + chrono::Duration::minutes(i.into())))
            .collect();
        let svc = AnalyticsService::new(
            InMemoryHistory {
                meters,
                ..InMemoryHistory::default()
            },
            FleetWide,
            AnalyticsSettings::default(),
        );
        let window = window_ending("2025-01-15T12:00:00Z");

        let first = svc
            .aggregate(DeviceClass::Meter, Some(&id("METER-001")), window)
            .await
            .unwrap();
        let second = svc
            .aggregate(DeviceClass::Meter, Some(&id("METER-001")), window)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.total_energy_kwh().to_bits(), second.total_energy_kwh().to_bits());
        assert_eq!(first.reading_count, 50);
    }

    #[tokio::test]
    async fn should_reject_non_positive_window_hours() {
        let svc = AnalyticsService::new(
            InMemoryHistory::default(),
            FleetWide,
            AnalyticsSettings::default(),
        );

        let err = svc
            .get_performance(&id("EV-001"), Some(0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChargeWatchError::Validation(_)));
    }
}
