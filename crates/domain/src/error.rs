//! Error taxonomy shared across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`ChargeWatchError`] via `From`. Callers branch on the variant to decide
//! whether to retry ([`ChargeWatchError::is_retryable`]), provision a
//! partition, or report a normal "nothing here" outcome.

use chrono::NaiveDate;

use crate::reading::DeviceClass;

/// Boxed error used for storage failures coming from adapters.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for every chargewatch operation.
#[derive(Debug, thiserror::Error)]
pub enum ChargeWatchError {
    /// The caller's input is malformed. Never retried.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The requested data does not exist. A normal outcome, not a fault.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The history partition for a timestamp has not been provisioned.
    #[error("missing partition")]
    MissingPartition(#[from] MissingPartitionError),

    /// The history partition for a timestamp was retired and cannot be reused.
    #[error("partition retired")]
    PartitionRetired(#[from] PartitionRetiredError),

    /// Connection, pool exhaustion or timeout. Safe to retry with backoff.
    #[error("transient storage error")]
    Transient(#[source] BoxedError),

    /// Any other storage failure.
    #[error("storage error")]
    Storage(#[source] BoxedError),
}

impl ChargeWatchError {
    /// Whether the failed operation can be retried as a whole.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Input rejected by domain invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("device id exceeds {max} characters")]
    DeviceIdTooLong { max: usize },

    #[error("{field} must be a finite, non-negative number, got {value}")]
    NegativeOrNonFinite { field: &'static str, value: f64 },

    #[error("state of charge must be within 0..=100, got {0}")]
    StateOfChargeOutOfRange(f64),

    #[error("battery temperature must be finite, got {0}")]
    NonFiniteTemperature(f64),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("timestamp {0} is finer than microsecond precision")]
    SubMicrosecondTimestamp(String),

    #[error("window start {start} is after window end {end}")]
    InvertedWindow { start: String, end: String },

    #[error("window must span at least one hour, got {0}")]
    InvalidWindowHours(i64),

    #[error("batch of {size} readings exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("unknown device class: {0}")]
    UnknownDeviceClass(String),
}

/// A lookup or aggregation matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A write targeted a day with no active history partition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no {class} history partition for {date}")]
pub struct MissingPartitionError {
    pub class: DeviceClass,
    pub date: NaiveDate,
}

/// A partition for this day existed once and has been detached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{class} history partition for {date} has been retired")]
pub struct PartitionRetiredError {
    pub class: DeviceClass,
    pub date: NaiveDate,
}
