//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use chargewatch_app::ports::{DeviceCorrelation, PartitionCatalog};

use crate::state::{AppState, TelemetryBackend};

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api/v1` and exposes `/health`.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<S, C, P>(state: AppState<S, C, P>) -> Router
where
    S: TelemetryBackend,
    C: DeviceCorrelation + Send + Sync + 'static,
    P: PartitionCatalog + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chargewatch_app::ports::{
        DualPathStore, FleetWide, HistoryStore, ScanResult, StatusStore, UnitReceipt,
        WindowScanner,
    };
    use chargewatch_app::services::analytics_service::{AnalyticsService, AnalyticsSettings};
    use chargewatch_app::services::ingest_service::{IngestService, IngestSettings};
    use chargewatch_app::services::partition_lifecycle::PartitionLifecycle;
    use chargewatch_app::services::telemetry_query::TelemetryQuery;
    use chargewatch_domain::error::{ChargeWatchError, MissingPartitionError};
    use chargewatch_domain::history::HistoryRecord;
    use chargewatch_domain::id::DeviceId;
    use chargewatch_domain::partition::{Detached, PartitionInfo, PartitionKey, PartitionOutcome};
    use chargewatch_domain::reading::{DeviceClass, Reading};
    use chargewatch_domain::status::CurrentStatus;
    use chargewatch_domain::window::{TimeWindow, WindowSums};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Accepts every unit except those touching 1999, which has no partition.
    struct StubStore;
    struct StubCatalog;

    impl<R: Reading> DualPathStore<R> for StubStore {
        async fn commit_unit(&self, readings: &[R]) -> Result<UnitReceipt, ChargeWatchError> {
            if let Some(old) = readings
                .iter()
                .find(|r| r.timestamp().date_naive().to_string().starts_with("1999"))
            {
                return Err(MissingPartitionError {
                    class: R::CLASS,
                    date: old.timestamp().date_naive(),
                }
                .into());
            }
            Ok(UnitReceipt {
                history_rows: readings.len(),
                status_rows: readings.len(),
                first_history_id: 42,
            })
        }
    }

    impl<R: Reading> StatusStore<R> for StubStore {
        async fn get_status(
            &self,
            _device_id: &DeviceId,
        ) -> Result<Option<CurrentStatus<R>>, ChargeWatchError> {
            Ok(None)
        }
        async fn list_statuses(&self) -> Result<Vec<CurrentStatus<R>>, ChargeWatchError> {
            Ok(vec![])
        }
    }

    impl<R: Reading> HistoryStore<R> for StubStore {
        async fn find_in_window(
            &self,
            _device_id: &DeviceId,
            _window: TimeWindow,
            _limit: Option<usize>,
        ) -> Result<Vec<HistoryRecord<R>>, ChargeWatchError> {
            Ok(vec![])
        }
        async fn count_for(&self, _device_id: &DeviceId) -> Result<u64, ChargeWatchError> {
            Ok(0)
        }
    }

    impl WindowScanner for StubStore {
        async fn scan(
            &self,
            _class: DeviceClass,
            _device_id: Option<&DeviceId>,
            _window: TimeWindow,
        ) -> Result<ScanResult, ChargeWatchError> {
            Ok(ScanResult {
                sums: WindowSums::default(),
                partitions_scanned: 0,
            })
        }
    }

    impl PartitionCatalog for StubCatalog {
        async fn ensure(&self, _key: PartitionKey) -> Result<PartitionOutcome, ChargeWatchError> {
            Ok(PartitionOutcome::Created)
        }
        async fn retire(&self, key: PartitionKey) -> Result<Detached, ChargeWatchError> {
            Ok(Detached {
                key,
                archived_as: format!("{}_archived", key.table_name()),
            })
        }
        async fn list(&self, _class: DeviceClass) -> Result<Vec<PartitionInfo>, ChargeWatchError> {
            Ok(vec![])
        }
    }

    fn test_state() -> AppState<StubStore, FleetWide, StubCatalog> {
        AppState::new(
            IngestService::new(StubStore, IngestSettings::default()),
            TelemetryQuery::new(StubStore),
            AnalyticsService::new(StubStore, FleetWide, AnalyticsSettings::default()),
            PartitionLifecycle::new(StubCatalog),
        )
        .with_max_request_readings(2)
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = build(test_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn meter_json(timestamp: &str) -> serde_json::Value {
        serde_json::json!({
            "deviceId": "METER-001",
            "kwhConsumedAc": 125.456,
            "voltage": 240.5,
            "timestamp": timestamp,
        })
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let app = build(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_acknowledge_accepted_reading() {
        let (status, body) = send(post_json(
            "/api/v1/meters/readings",
            &meter_json("2025-01-15T10:00:00Z"),
        ))
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["class"], "meter");
        assert_eq!(body["deviceId"], "METER-001");
        assert_eq!(body["historyId"], 42);
    }

    #[tokio::test]
    async fn should_reject_out_of_range_state_of_charge() {
        let (status, body) = send(post_json(
            "/api/v1/vehicles/readings",
            &serde_json::json!({
                "deviceId": "EV-001",
                "soc": 120.0,
                "kwhDeliveredDc": 1.0,
                "timestamp": "2025-01-15T10:00:00Z",
            }),
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("120"));
    }

    #[tokio::test]
    async fn should_answer_conflict_when_partition_is_missing() {
        let (status, _body) = send(post_json(
            "/api/v1/meters/readings",
            &meter_json("1999-01-01T00:00:00Z"),
        ))
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn should_reject_batch_over_the_request_cap() {
        let batch = serde_json::json!([
            meter_json("2025-01-15T10:00:00Z"),
            meter_json("2025-01-15T10:01:00Z"),
            meter_json("2025-01-15T10:02:00Z"),
        ]);

        let (status, body) = send(post_json("/api/v1/meters/readings/batch", &batch)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("limit of 2"));
    }

    #[tokio::test]
    async fn should_report_batch_progress_on_failure() {
        let batch = serde_json::json!([meter_json("1999-01-01T00:00:00Z")]);

        let (status, body) = send(post_json("/api/v1/meters/readings/batch", &batch)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["committedChunks"], 0);
        assert_eq!(body["failedChunk"], 1);
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_status() {
        let (status, _body) = send(
            Request::builder()
                .uri("/api/v1/vehicles/EV-404/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_return_not_found_for_vehicle_without_history() {
        let (status, _body) = send(
            Request::builder()
                .uri("/api/v1/analytics/performance/EV-404?window_hours=12")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_reject_inverted_history_window() {
        let (status, _body) = send(
            Request::builder()
                .uri("/api/v1/meters/METER-001/history?from=2025-01-16T00:00:00Z&to=2025-01-15T00:00:00Z")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_reject_unknown_partition_class() {
        let (status, _body) = send(
            Request::builder()
                .method("PUT")
                .uri("/api/v1/partitions/chargers/2025-01-15")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_create_partition_on_put() {
        let (status, body) = send(
            Request::builder()
                .method("PUT")
                .uri("/api/v1/partitions/meter/2025-01-15")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["tableName"], "meter_history_p20250115");
        assert_eq!(body["outcome"], "created");
    }
}
