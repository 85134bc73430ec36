//! Telemetry storage ports: the two storage representations of a reading.

use std::future::Future;

use chargewatch_domain::error::ChargeWatchError;
use chargewatch_domain::history::{HistoryId, HistoryRecord};
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::Reading;
use chargewatch_domain::status::CurrentStatus;
use chargewatch_domain::window::TimeWindow;

/// What one committed unit of work wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitReceipt {
    /// History rows inserted; always the number of readings in the unit.
    pub history_rows: usize,
    /// Distinct device ids upserted into current status.
    pub status_rows: usize,
    /// Id of the first history row; the unit's rows use consecutive ids.
    pub first_history_id: HistoryId,
}

/// Atomic writer covering current status and history of one reading class.
pub trait DualPathStore<R: Reading> {
    /// Apply `readings` as one unit of work.
    ///
    /// Inside a single transaction: one bulk upsert of current status
    /// (last reading per device id wins), then one bulk insert of a history
    /// row per reading. Either both commit or neither is visible.
    ///
    /// Fails with [`ChargeWatchError::MissingPartition`] when any reading
    /// falls on a day without an active history partition.
    fn commit_unit(
        &self,
        readings: &[R],
    ) -> impl Future<Output = Result<UnitReceipt, ChargeWatchError>> + Send;
}

/// Keyed lookup of the current status rows of one reading class.
pub trait StatusStore<R: Reading> {
    /// Current status of `device_id`, if it ever reported.
    fn get_status(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<CurrentStatus<R>>, ChargeWatchError>> + Send;

    /// Every current status row, ordered by device id.
    fn list_statuses(
        &self,
    ) -> impl Future<Output = Result<Vec<CurrentStatus<R>>, ChargeWatchError>> + Send;
}

/// Read access to the history rows of one reading class.
pub trait HistoryStore<R: Reading> {
    /// History of `device_id` inside `window`, ordered by timestamp ascending.
    fn find_in_window(
        &self,
        device_id: &DeviceId,
        window: TimeWindow,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<HistoryRecord<R>>, ChargeWatchError>> + Send;

    /// Number of history rows kept for `device_id` across active partitions.
    fn count_for(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<u64, ChargeWatchError>> + Send;
}
