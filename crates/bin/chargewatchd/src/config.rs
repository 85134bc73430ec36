//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `chargewatch.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use chargewatch_app::ports::StaticCorrelation;
use chargewatch_app::services::analytics_service::AnalyticsSettings;
use chargewatch_app::services::ingest_service::{IngestSettings, MAX_CHUNK_SIZE};
use chargewatch_app::services::partition_lifecycle::MAX_DAYS_AHEAD;
use chargewatch_domain::efficiency::EfficiencyThresholds;
use chargewatch_domain::id::DeviceId;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Write path settings.
    pub ingest: IngestConfig,
    /// Aggregation and classification settings.
    pub analytics: AnalyticsConfig,
    /// Partition maintenance schedule.
    pub partitions: PartitionsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
    /// Wait for a free connection before failing with a transient error.
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Readings per unit of work when a batch is split.
    pub chunk_size: usize,
    /// Maximum execution time of one unit of work.
    pub unit_timeout_ms: u64,
    /// Largest batch accepted over HTTP.
    pub max_request_readings: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Maximum execution time of one window scan.
    pub scan_timeout_ms: u64,
    /// Window length used when a request does not name one.
    pub default_window_hours: i64,
    pub healthy_threshold: f64,
    pub degraded_threshold: f64,
    /// Vehicle id → meter id.
    pub correlations: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PartitionsConfig {
    /// Run the maintenance loop.
    pub enabled: bool,
    /// Days provisioned after today.
    pub days_ahead: u32,
    /// Days of history kept before retirement.
    pub retention_days: u32,
    /// Seconds between maintenance passes.
    pub interval_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `chargewatch.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if
    /// the resulting values are inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("chargewatch.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CHARGEWATCH_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("CHARGEWATCH_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("CHARGEWATCH_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("CHARGEWATCH_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("CHARGEWATCH_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.ingest.chunk_size == 0 || self.ingest.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::Validation(format!(
                "ingest.chunk_size must be within 1..={MAX_CHUNK_SIZE}"
            )));
        }
        if self.partitions.days_ahead > MAX_DAYS_AHEAD {
            return Err(ConfigError::Validation(format!(
                "partitions.days_ahead must be at most {MAX_DAYS_AHEAD}"
            )));
        }
        if self.ingest.max_request_readings == 0 {
            return Err(ConfigError::Validation(
                "ingest.max_request_readings must be non-zero".to_string(),
            ));
        }
        if self.analytics.default_window_hours <= 0 {
            return Err(ConfigError::Validation(
                "analytics.default_window_hours must be positive".to_string(),
            ));
        }
        self.thresholds()?;
        self.correlation()?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Storage adapter configuration.
    #[must_use]
    pub fn storage(&self) -> chargewatch_adapter_storage_sqlite_sqlx::Config {
        chargewatch_adapter_storage_sqlite_sqlx::Config {
            database_url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            acquire_timeout: Duration::from_millis(self.database.acquire_timeout_ms),
        }
    }

    #[must_use]
    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            chunk_size: self.ingest.chunk_size,
            unit_timeout: Duration::from_millis(self.ingest.unit_timeout_ms),
        }
    }

    /// # Errors
    ///
    /// Returns an error when the thresholds are out of range or inverted.
    pub fn analytics_settings(&self) -> Result<AnalyticsSettings, ConfigError> {
        Ok(AnalyticsSettings {
            scan_timeout: Duration::from_millis(self.analytics.scan_timeout_ms),
            default_window_hours: self.analytics.default_window_hours,
            thresholds: self.thresholds()?,
        })
    }

    fn thresholds(&self) -> Result<EfficiencyThresholds, ConfigError> {
        EfficiencyThresholds::new(
            self.analytics.healthy_threshold,
            self.analytics.degraded_threshold,
        )
        .map_err(|err| ConfigError::Validation(err.to_string()))
    }

    /// Vehicle → meter mapping from `[analytics.correlations]`.
    ///
    /// # Errors
    ///
    /// Returns an error when a key or value is not a valid device id.
    pub fn correlation(&self) -> Result<StaticCorrelation, ConfigError> {
        let pairs = self
            .analytics
            .correlations
            .iter()
            .map(|(vehicle, meter)| {
                let vehicle = DeviceId::new(vehicle.as_str())
                    .map_err(|err| ConfigError::Validation(format!("correlation key: {err}")))?;
                let meter = DeviceId::new(meter.as_str())
                    .map_err(|err| ConfigError::Validation(format!("correlation value: {err}")))?;
                Ok((vehicle, meter))
            })
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;
        Ok(StaticCorrelation::new(pairs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:chargewatch.db?mode=rwc".to_string(),
            max_connections: 8,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            unit_timeout_ms: 30_000,
            max_request_readings: 1000,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: 10_000,
            default_window_hours: 24,
            healthy_threshold: 0.85,
            degraded_threshold: 0.75,
            correlations: HashMap::new(),
        }
    }
}

impl Default for PartitionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days_ahead: 7,
            retention_days: 90,
            interval_secs: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "chargewatchd=info,chargewatch=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
