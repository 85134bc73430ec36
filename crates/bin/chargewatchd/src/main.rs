//! # chargewatchd: chargewatch daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the storage adapters and inject them into application services
//! - Provision history partitions and keep them rolling in the background
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chargewatch_adapter_http_axum::state::AppState;
use chargewatch_adapter_storage_sqlite_sqlx::{SqlitePartitionCatalog, SqliteTelemetryStore};
use chargewatch_app::ports::PartitionCatalog;
use chargewatch_app::services::analytics_service::AnalyticsService;
use chargewatch_app::services::ingest_service::IngestService;
use chargewatch_app::services::partition_lifecycle::PartitionLifecycle;
use chargewatch_app::services::telemetry_query::TelemetryQuery;
use chargewatch_domain::time::now;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, PartitionsConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = config
        .storage()
        .build()
        .await
        .with_context(|| format!("opening database {}", config.database_url()))?;
    let pool = db.pool().clone();

    // Adapters
    let store = SqliteTelemetryStore::new(pool.clone());
    let catalog = SqlitePartitionCatalog::new(pool);

    // Services
    let ingest = Arc::new(IngestService::new(store.clone(), config.ingest_settings()));
    let telemetry = Arc::new(TelemetryQuery::new(store.clone()));
    let analytics = Arc::new(AnalyticsService::new(
        store,
        config.correlation()?,
        config.analytics_settings()?,
    ));
    let partitions = Arc::new(PartitionLifecycle::new(catalog));

    let summary = partitions
        .provision_ahead(now().date_naive(), config.partitions.days_ahead)
        .await
        .context("provisioning history partitions")?;
    tracing::info!(
        created = summary.created,
        already_existed = summary.already_existed,
        "history partitions ready"
    );

    if config.partitions.enabled {
        spawn_maintenance(Arc::clone(&partitions), &config.partitions);
    }

    // HTTP
    let state = AppState::from_arcs(ingest, telemetry, analytics, partitions)
        .with_max_request_readings(config.ingest.max_request_readings);
    let app = chargewatch_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(%bind_addr, "chargewatchd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("chargewatchd stopped");
    Ok(())
}

/// Run a maintenance pass every `interval_secs`, logging failures.
fn spawn_maintenance<P>(partitions: Arc<PartitionLifecycle<P>>, settings: &PartitionsConfig)
where
    P: PartitionCatalog + Send + Sync + 'static,
{
    let days_ahead = settings.days_ahead;
    let retention_days = settings.retention_days;
    let period = Duration::from_secs(settings.interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // the first tick completes immediately and startup already provisioned
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match partitions
                .run_maintenance(now().date_naive(), days_ahead, retention_days)
                .await
            {
                Ok(report) => tracing::debug!(
                    created = report.provisioned.created,
                    retired = report.retired.len(),
                    "partition maintenance complete"
                ),
                Err(err) => tracing::warn!(error = %err, "partition maintenance failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
