//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod analytics_service;
pub mod ingest_service;
pub mod partition_lifecycle;
pub mod telemetry_query;
