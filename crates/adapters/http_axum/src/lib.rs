//! # chargewatch-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Accept meter and vehicle readings, one at a time or in batches
//!   (`/api/v1/meters/readings`, `/api/v1/vehicles/readings/batch`, …)
//! - Validate request bodies before anything reaches the write path
//! - Serve current status, history, performance reports and partition admin
//! - Map application results and errors into JSON responses
//!
//! ## Dependency rule
//! Depends on `chargewatch-app` (for port traits and services) and
//! `chargewatch-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
