//! JSON REST handlers for reading ingestion.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use chargewatch_app::ports::{DeviceCorrelation, DualPathStore, PartitionCatalog};
use chargewatch_domain::error::ValidationError;
use chargewatch_domain::history::HistoryId;
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::{DeviceClass, Reading};

use crate::error::{ApiError, BatchApiError};
use crate::state::{AppState, TelemetryBackend};

/// Body returned once a single reading is applied.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckBody {
    pub class: DeviceClass,
    pub device_id: DeviceId,
    pub history_id: HistoryId,
}

/// Body returned once every chunk of a batch is applied.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAckBody {
    pub batch_id: uuid::Uuid,
    pub class: DeviceClass,
    pub accepted: usize,
    pub chunks: usize,
}

/// Possible responses from the single-reading endpoint.
pub enum IngestResponse {
    Created(Json<AckBody>),
}

impl IntoResponse for IngestResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the batch endpoint.
pub enum BatchResponse {
    Created(Json<BatchAckBody>),
}

impl IntoResponse for BatchResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// `POST /api/v1/{meters,vehicles}/readings`
pub async fn ingest<S, C, P, R>(
    State(state): State<AppState<S, C, P>>,
    Json(reading): Json<R>,
) -> Result<IngestResponse, ApiError>
where
    S: TelemetryBackend + DualPathStore<R>,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
    R: Reading + DeserializeOwned,
{
    reading.validate()?;
    let ack = state.ingest.apply_reading(reading).await?;

    Ok(IngestResponse::Created(Json(AckBody {
        class: ack.class,
        device_id: ack.device_id,
        history_id: ack.history_id,
    })))
}

/// `POST /api/v1/{meters,vehicles}/readings/batch`
///
/// The whole request is validated before the first chunk is written; a
/// single invalid reading rejects the batch without side effects.
pub async fn ingest_batch<S, C, P, R>(
    State(state): State<AppState<S, C, P>>,
    Json(readings): Json<Vec<R>>,
) -> Result<BatchResponse, BatchApiError>
where
    S: TelemetryBackend + DualPathStore<R>,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
    R: Reading + DeserializeOwned,
{
    if readings.len() > state.max_request_readings {
        return Err(ValidationError::BatchTooLarge {
            size: readings.len(),
            max: state.max_request_readings,
        }
        .into());
    }
    for reading in &readings {
        reading.validate()?;
    }

    let ack = state.ingest.apply_batch(readings).await?;

    Ok(BatchResponse::Created(Json(BatchAckBody {
        batch_id: ack.batch_id,
        class: ack.class,
        accepted: ack.accepted,
        chunks: ack.chunks,
    })))
}
