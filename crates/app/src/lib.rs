//! # chargewatch-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DualPathStore`: apply a unit of readings to current status and history atomically
//!   - `StatusStore` / `HistoryStore`: read back current status and history rows
//!   - `WindowScanner`: partition-pruned window sums over history
//!   - `PartitionCatalog`: create, retire and list history partitions
//!   - `DeviceCorrelation`: which meter feeds a given vehicle
//! - Define **driving/inbound ports** as use-case structs:
//!   - `IngestService`: the dual-path writer (single readings and chunked batches)
//!   - `AnalyticsService`: window aggregates and performance reports
//!   - `TelemetryQuery`: current status and history lookups
//!   - `PartitionLifecycle`: rolling provisioning and retirement of partitions
//!
//! ## Dependency rule
//! Depends on `chargewatch-domain` only (plus `tokio::time` for deadlines).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod deadline;
pub mod ports;
pub mod services;
