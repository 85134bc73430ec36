//! JSON REST handlers for current status and history.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use chargewatch_app::ports::{DeviceCorrelation, HistoryStore, PartitionCatalog, StatusStore};
use chargewatch_domain::history::HistoryRecord;
use chargewatch_domain::reading::Reading;
use chargewatch_domain::status::CurrentStatus;

use super::{parse_device_id, resolve_window};
use crate::error::ApiError;
use crate::state::{AppState, TelemetryBackend};

/// Default limit for history records.
const DEFAULT_LIMIT: usize = 1000;

/// Query parameters for the history endpoint.
#[derive(Deserialize)]
pub struct HistoryQuery {
    /// Start of time range (RFC 3339). Defaults to 24 hours before `to`.
    pub from: Option<String>,
    /// End of time range (RFC 3339). Defaults to now.
    pub to: Option<String>,
    /// Maximum number of records. Defaults to 1000.
    pub limit: Option<usize>,
}

/// Possible responses from the status endpoint.
pub enum GetResponse<R> {
    Ok(Json<CurrentStatus<R>>),
}

impl<R: Serialize> IntoResponse for GetResponse<R> {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the status list endpoint.
pub enum ListResponse<R> {
    Ok(Json<Vec<CurrentStatus<R>>>),
}

impl<R: Serialize> IntoResponse for ListResponse<R> {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the history endpoint.
pub enum HistoryResponse<R> {
    Ok(Json<Vec<HistoryRecord<R>>>),
}

impl<R: Serialize> IntoResponse for HistoryResponse<R> {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/v1/{meters,vehicles}`
pub async fn list<S, C, P, R>(
    State(state): State<AppState<S, C, P>>,
) -> Result<ListResponse<R>, ApiError>
where
    S: TelemetryBackend + StatusStore<R>,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
    R: Reading + Serialize,
{
    let statuses = state.telemetry.list_statuses::<R>().await?;
    Ok(ListResponse::Ok(Json(statuses)))
}

/// `GET /api/v1/{meters,vehicles}/{id}/status`
pub async fn get<S, C, P, R>(
    State(state): State<AppState<S, C, P>>,
    Path(id): Path<String>,
) -> Result<GetResponse<R>, ApiError>
where
    S: TelemetryBackend + StatusStore<R>,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
    R: Reading + Serialize,
{
    let device_id = parse_device_id(id)?;
    let status = state.telemetry.get_status::<R>(&device_id).await?;
    Ok(GetResponse::Ok(Json(status)))
}

/// `GET /api/v1/{meters,vehicles}/{id}/history?from=&to=&limit=`
pub async fn history<S, C, P, R>(
    State(state): State<AppState<S, C, P>>,
    Path(id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<HistoryResponse<R>, ApiError>
where
    S: TelemetryBackend + HistoryStore<R>,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
    R: Reading + Serialize,
{
    let device_id = parse_device_id(id)?;
    let window = resolve_window(params.from.as_deref(), params.to.as_deref())?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let records = state
        .telemetry
        .history::<R>(&device_id, window, Some(limit))
        .await?;
    Ok(HistoryResponse::Ok(Json(records)))
}
