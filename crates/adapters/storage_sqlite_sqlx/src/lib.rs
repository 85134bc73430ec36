//! # chargewatch-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the telemetry, window-scan and partition ports defined in `chargewatch-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Route history rows to per-day partition tables and prune scans to the
//!   partitions a window touches
//!
//! ## Dependency rule
//! Depends on `chargewatch-app` (for port traits) and `chargewatch-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod partition_catalog;
pub mod pool;
mod tables;
pub mod telemetry_store;

pub use error::StorageError;
pub use partition_catalog::SqlitePartitionCatalog;
pub use pool::{Config, Database};
pub use telemetry_store::SqliteTelemetryStore;
