//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod analytics;
#[allow(clippy::missing_errors_doc)]
pub mod partitions;
#[allow(clippy::missing_errors_doc)]
pub mod readings;
#[allow(clippy::missing_errors_doc)]
pub mod status;

use axum::Router;
use axum::routing::{get, post, put};

use chargewatch_app::ports::{DeviceCorrelation, PartitionCatalog};
use chargewatch_domain::error::ValidationError;
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::{MeterReading, VehicleReading};
use chargewatch_domain::time::{Timestamp, now};
use chargewatch_domain::window::{DEFAULT_WINDOW_HOURS, TimeWindow};

use crate::state::{AppState, TelemetryBackend};

/// Build the `/api/v1` sub-router.
pub fn routes<S, C, P>() -> Router<AppState<S, C, P>>
where
    S: TelemetryBackend,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
{
    Router::new()
        // Meters
        .route(
            "/meters",
            get(status::list::<S, C, P, MeterReading>),
        )
        .route(
            "/meters/readings",
            post(readings::ingest::<S, C, P, MeterReading>),
        )
        .route(
            "/meters/readings/batch",
            post(readings::ingest_batch::<S, C, P, MeterReading>),
        )
        .route(
            "/meters/{id}/status",
            get(status::get::<S, C, P, MeterReading>),
        )
        .route(
            "/meters/{id}/history",
            get(status::history::<S, C, P, MeterReading>),
        )
        // Vehicles
        .route(
            "/vehicles",
            get(status::list::<S, C, P, VehicleReading>),
        )
        .route(
            "/vehicles/readings",
            post(readings::ingest::<S, C, P, VehicleReading>),
        )
        .route(
            "/vehicles/readings/batch",
            post(readings::ingest_batch::<S, C, P, VehicleReading>),
        )
        .route(
            "/vehicles/{id}/status",
            get(status::get::<S, C, P, VehicleReading>),
        )
        .route(
            "/vehicles/{id}/history",
            get(status::history::<S, C, P, VehicleReading>),
        )
        // Analytics
        .route(
            "/analytics/performance/{vehicle_id}",
            get(analytics::performance::<S, C, P>),
        )
        .route(
            "/analytics/aggregate/{class}",
            get(analytics::aggregate::<S, C, P>),
        )
        // Partitions
        .route("/partitions/{class}", get(partitions::list::<S, C, P>))
        .route(
            "/partitions/{class}/{date}",
            put(partitions::ensure::<S, C, P>).delete(partitions::retire::<S, C, P>),
        )
}

/// Parse a path segment into a [`DeviceId`].
fn parse_device_id(raw: String) -> Result<DeviceId, ValidationError> {
    DeviceId::new(raw)
}

/// Parse an RFC 3339 timestamp, normalised to UTC.
fn parse_timestamp(value: &str) -> Result<Timestamp, ValidationError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(|_| ValidationError::InvalidTimestamp(value.to_owned()))
}

/// Window from optional `from` / `to` query values: `to` defaults to now,
/// `from` to 24 hours before `to`.
fn resolve_window(from: Option<&str>, to: Option<&str>) -> Result<TimeWindow, ValidationError> {
    let to = to.map(parse_timestamp).transpose()?.unwrap_or_else(now);
    let from = from
        .map(parse_timestamp)
        .transpose()?
        .unwrap_or_else(|| to - chrono::Duration::hours(DEFAULT_WINDOW_HOURS));
    TimeWindow::new(from, to)
}
