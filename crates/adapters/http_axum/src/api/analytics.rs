//! JSON REST handlers for window aggregates and performance reports.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use chargewatch_app::ports::{DeviceCorrelation, PartitionCatalog};
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::DeviceClass;
use chargewatch_domain::report::PerformanceReport;
use chargewatch_domain::window::WindowAggregate;

use super::{parse_device_id, resolve_window};
use crate::error::ApiError;
use crate::state::{AppState, TelemetryBackend};

/// Query parameters for the performance endpoint.
#[derive(Deserialize)]
pub struct PerformanceQuery {
    /// Trailing window length ending now. Defaults to 24.
    pub window_hours: Option<i64>,
    /// Meter to compare against, overriding any configured correlation.
    pub meter_id: Option<String>,
}

/// Query parameters for the aggregate endpoint.
#[derive(Deserialize)]
pub struct AggregateQuery {
    /// Restrict to one device; the whole class otherwise.
    pub device_id: Option<String>,
    /// Start of the window (RFC 3339). Defaults to 24 hours before `to`.
    pub from: Option<String>,
    /// End of the window (RFC 3339). Defaults to now.
    pub to: Option<String>,
}

/// Possible responses from the performance endpoint.
pub enum PerformanceResponse {
    Ok(Json<PerformanceReport>),
}

impl IntoResponse for PerformanceResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the aggregate endpoint.
pub enum AggregateResponse {
    Ok(Json<WindowAggregate>),
}

impl IntoResponse for AggregateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/v1/analytics/performance/{vehicle_id}?window_hours=&meter_id=`
pub async fn performance<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    Path(vehicle_id): Path<String>,
    Query(params): Query<PerformanceQuery>,
) -> Result<PerformanceResponse, ApiError>
where
    S: TelemetryBackend,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
{
    let vehicle_id = parse_device_id(vehicle_id)?;
    let meter_id = params.meter_id.map(DeviceId::new).transpose()?;

    let report = state
        .analytics
        .get_performance(&vehicle_id, params.window_hours, meter_id)
        .await?;
    Ok(PerformanceResponse::Ok(Json(report)))
}

/// `GET /api/v1/analytics/aggregate/{class}?device_id=&from=&to=`
pub async fn aggregate<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    Path(class): Path<String>,
    Query(params): Query<AggregateQuery>,
) -> Result<AggregateResponse, ApiError>
where
    S: TelemetryBackend,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
{
    let class = DeviceClass::from_str(&class)?;
    let device_id = params.device_id.map(parse_device_id).transpose()?;
    let window = resolve_window(params.from.as_deref(), params.to.as_deref())?;

    let aggregate = state
        .analytics
        .aggregate(class, device_id.as_ref(), window)
        .await?;
    Ok(AggregateResponse::Ok(Json(aggregate)))
}
