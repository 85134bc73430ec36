//! Shared application state for axum handlers.

use std::sync::Arc;

use chargewatch_app::ports::{
    DeviceCorrelation, DualPathStore, HistoryStore, PartitionCatalog, StatusStore, WindowScanner,
};
use chargewatch_app::services::analytics_service::AnalyticsService;
use chargewatch_app::services::ingest_service::IngestService;
use chargewatch_app::services::partition_lifecycle::PartitionLifecycle;
use chargewatch_app::services::telemetry_query::TelemetryQuery;
use chargewatch_domain::reading::{MeterReading, VehicleReading};

/// Largest batch accepted by the batch endpoints unless configured otherwise.
pub const DEFAULT_MAX_REQUEST_READINGS: usize = 1000;

/// Every storage port the HTTP layer needs, for both reading classes.
pub trait TelemetryBackend:
    DualPathStore<MeterReading>
    + DualPathStore<VehicleReading>
    + StatusStore<MeterReading>
    + StatusStore<VehicleReading>
    + HistoryStore<MeterReading>
    + HistoryStore<VehicleReading>
    + WindowScanner
    + Send
    + Sync
    + 'static
{
}

impl<T> TelemetryBackend for T where
    T: DualPathStore<MeterReading>
        + DualPathStore<VehicleReading>
        + StatusStore<MeterReading>
        + StatusStore<VehicleReading>
        + HistoryStore<MeterReading>
        + HistoryStore<VehicleReading>
        + WindowScanner
        + Send
        + Sync
        + 'static
{
}

/// Application state shared across all axum handlers.
///
/// Generic over the telemetry store, the device correlation and the
/// partition catalog to avoid dynamic dispatch. `Clone` is implemented
/// manually so the underlying types themselves do not need to be `Clone`.
pub struct AppState<S, C, P> {
    /// Dual-path writer.
    pub ingest: Arc<IngestService<S>>,
    /// Status and history lookups.
    pub telemetry: Arc<TelemetryQuery<S>>,
    /// Window aggregates and performance reports.
    pub analytics: Arc<AnalyticsService<S, C>>,
    /// Partition administration.
    pub partitions: Arc<PartitionLifecycle<P>>,
    /// Upper bound on readings per batch request.
    pub max_request_readings: usize,
}

impl<S, C, P> Clone for AppState<S, C, P> {
    fn clone(&self) -> Self {
        Self {
            ingest: Arc::clone(&self.ingest),
            telemetry: Arc::clone(&self.telemetry),
            analytics: Arc::clone(&self.analytics),
            partitions: Arc::clone(&self.partitions),
            max_request_readings: self.max_request_readings,
        }
    }
}

impl<S, C, P> AppState<S, C, P>
where
    S: TelemetryBackend,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
{
    /// Create a new application state from service instances.
    pub fn new(
        ingest: IngestService<S>,
        telemetry: TelemetryQuery<S>,
        analytics: AnalyticsService<S, C>,
        partitions: PartitionLifecycle<P>,
    ) -> Self {
        Self::from_arcs(
            Arc::new(ingest),
            Arc::new(telemetry),
            Arc::new(analytics),
            Arc::new(partitions),
        )
    }

    /// Create a new application state from pre-wrapped `Arc` services.
    ///
    /// Use this when services need to be shared with background tasks
    /// before constructing the HTTP state.
    pub fn from_arcs(
        ingest: Arc<IngestService<S>>,
        telemetry: Arc<TelemetryQuery<S>>,
        analytics: Arc<AnalyticsService<S, C>>,
        partitions: Arc<PartitionLifecycle<P>>,
    ) -> Self {
        Self {
            ingest,
            telemetry,
            analytics,
            partitions,
            max_request_readings: DEFAULT_MAX_REQUEST_READINGS,
        }
    }

    /// Override the batch size cap.
    #[must_use]
    pub fn with_max_request_readings(mut self, max: usize) -> Self {
        self.max_request_readings = max.max(1);
        self
    }
}
