//! # chargewatch-domain
//!
//! Pure domain model for the chargewatch telemetry engine.
//!
//! ## Responsibilities
//! - Foundational types: device identifiers, error taxonomy, timestamps
//! - Define **Readings** (one telemetry sample from a grid meter or a vehicle charger)
//! - Define **Current status** and **History** rows (the two storage representations)
//! - Define **Time windows** and the window accumulator used by aggregation
//! - Define the **Efficiency classifier** and the **Performance report**
//! - Define **Partition keys** (deterministic per-day naming of history partitions)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod efficiency;
pub mod history;
pub mod partition;
pub mod reading;
pub mod report;
pub mod status;
pub mod window;
