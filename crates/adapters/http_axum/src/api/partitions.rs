//! JSON REST handlers for partition administration.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Serialize;

use chargewatch_app::ports::{DeviceCorrelation, PartitionCatalog};
use chargewatch_domain::error::ValidationError;
use chargewatch_domain::partition::{Detached, PartitionInfo, PartitionKey, PartitionOutcome};
use chargewatch_domain::reading::DeviceClass;

use crate::error::ApiError;
use crate::state::{AppState, TelemetryBackend};

/// Body returned by the ensure endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureBody {
    pub table_name: String,
    pub outcome: PartitionOutcome,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<PartitionInfo>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the ensure endpoint.
pub enum EnsureResponse {
    Created(Json<EnsureBody>),
    Ok(Json<EnsureBody>),
}

impl IntoResponse for EnsureResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the retire endpoint.
pub enum RetireResponse {
    Ok(Json<Detached>),
}

impl IntoResponse for RetireResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::from_str(raw).map_err(|_| ValidationError::InvalidTimestamp(raw.to_owned()))
}

/// `GET /api/v1/partitions/{class}`
pub async fn list<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    Path(class): Path<String>,
) -> Result<ListResponse, ApiError>
where
    S: TelemetryBackend,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
{
    let class = DeviceClass::from_str(&class)?;
    let partitions = state.partitions.list_partitions(class).await?;
    Ok(ListResponse::Ok(Json(partitions)))
}

/// `PUT /api/v1/partitions/{class}/{date}`
pub async fn ensure<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    Path((class, date)): Path<(String, String)>,
) -> Result<EnsureResponse, ApiError>
where
    S: TelemetryBackend,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
{
    let class = DeviceClass::from_str(&class)?;
    let date = parse_date(&date)?;

    let outcome = state.partitions.ensure_partition(class, date).await?;
    let body = Json(EnsureBody {
        table_name: PartitionKey::new(class, date).table_name(),
        outcome,
    });
    Ok(match outcome {
        PartitionOutcome::Created => EnsureResponse::Created(body),
        PartitionOutcome::AlreadyExists => EnsureResponse::Ok(body),
    })
}

/// `DELETE /api/v1/partitions/{class}/{date}`
pub async fn retire<S, C, P>(
    State(state): State<AppState<S, C, P>>,
    Path((class, date)): Path<(String, String)>,
) -> Result<RetireResponse, ApiError>
where
    S: TelemetryBackend,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
{
    let class = DeviceClass::from_str(&class)?;
    let date = parse_date(&date)?;

    let detached = state.partitions.retire_partition(class, date).await?;
    Ok(RetireResponse::Ok(Json(detached)))
}
