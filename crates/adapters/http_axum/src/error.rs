//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use chargewatch_app::services::ingest_service::BatchWriteError;
use chargewatch_domain::error::{ChargeWatchError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

/// Progress report attached to a failed batch.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchErrorBody {
    error: String,
    batch_id: uuid::Uuid,
    committed_chunks: usize,
    committed_readings: usize,
    failed_chunk: usize,
    total_chunks: usize,
    retryable: bool,
}

/// Maps [`ChargeWatchError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(ChargeWatchError);

impl From<ChargeWatchError> for ApiError {
    fn from(err: ChargeWatchError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

fn status_and_message(err: &ChargeWatchError) -> (StatusCode, String) {
    match err {
        ChargeWatchError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
        ChargeWatchError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
        ChargeWatchError::MissingPartition(err) => (StatusCode::CONFLICT, err.to_string()),
        ChargeWatchError::PartitionRetired(err) => (StatusCode::CONFLICT, err.to_string()),
        ChargeWatchError::Transient(err) => {
            tracing::warn!(error = %err, "transient storage error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "storage temporarily unavailable".to_string(),
            )
        }
        ChargeWatchError::Storage(err) => {
            tracing::error!(error = %err, "storage error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = status_and_message(&self.0);
        let retryable = self.0.is_retryable().then_some(true);

        (
            status,
            Json(ErrorBody {
                error: message,
                retryable,
            }),
        )
            .into_response()
    }
}

/// Errors of the batch endpoints: rejected before any write, or stopped
/// part-way with earlier chunks committed.
#[derive(Debug)]
pub enum BatchApiError {
    Rejected(ApiError),
    Partial(BatchWriteError),
}

impl From<ApiError> for BatchApiError {
    fn from(err: ApiError) -> Self {
        Self::Rejected(err)
    }
}

impl From<ValidationError> for BatchApiError {
    fn from(err: ValidationError) -> Self {
        Self::Rejected(err.into())
    }
}

impl From<BatchWriteError> for BatchApiError {
    fn from(err: BatchWriteError) -> Self {
        Self::Partial(err)
    }
}

impl IntoResponse for BatchApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Rejected(err) => return err.into_response(),
            Self::Partial(err) => err,
        };
        let (status, message) = status_and_message(&err.source);
        let body = BatchErrorBody {
            error: message,
            batch_id: err.batch_id,
            committed_chunks: err.committed_chunks,
            committed_readings: err.committed_readings,
            failed_chunk: err.failed_chunk,
            total_chunks: err.total_chunks,
            retryable: err.source.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargewatch_domain::error::{MissingPartitionError, NotFoundError};
    use chargewatch_domain::reading::DeviceClass;

    fn status_of(err: ChargeWatchError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn should_map_each_error_kind_to_its_status() {
        assert_eq!(
            status_of(ValidationError::EmptyDeviceId.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                NotFoundError {
                    entity: "VehicleHistory",
                    id: "EV-1".to_string(),
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                MissingPartitionError {
                    class: DeviceClass::Meter,
                    date: chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ChargeWatchError::Transient("pool timed out".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ChargeWatchError::Storage("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
