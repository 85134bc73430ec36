//! Telemetry query service: read side of current status and history.

use chargewatch_domain::error::{ChargeWatchError, NotFoundError};
use chargewatch_domain::history::HistoryRecord;
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::{DeviceClass, Reading};
use chargewatch_domain::status::CurrentStatus;
use chargewatch_domain::window::TimeWindow;

use crate::ports::{HistoryStore, StatusStore};

/// Upper bound applied to history listings.
pub const MAX_HISTORY_LIMIT: usize = 10_000;

/// Application service answering status and history lookups.
pub struct TelemetryQuery<S> {
    store: S,
}

impl<S> TelemetryQuery<S> {
    /// Create a new service reading through `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current status of one device.
    ///
    /// # Errors
    ///
    /// Returns [`ChargeWatchError::NotFound`] when the device never reported.
    #[tracing::instrument(skip(self), fields(class = %R::CLASS))]
    pub async fn get_status<R>(&self, device_id: &DeviceId) -> Result<CurrentStatus<R>, ChargeWatchError>
    where
        R: Reading,
        S: StatusStore<R>,
    {
        self.store
            .get_status(device_id)
            .await?
            .ok_or_else(|| {
                NotFoundError {
                    entity: status_entity(R::CLASS),
                    id: device_id.to_string(),
                }
                .into()
            })
    }

    /// Every current status row of the class.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the rows cannot be read.
    pub async fn list_statuses<R>(&self) -> Result<Vec<CurrentStatus<R>>, ChargeWatchError>
    where
        R: Reading,
        S: StatusStore<R>,
    {
        self.store.list_statuses().await
    }

    /// History of one device inside `window`, oldest first, capped at
    /// [`MAX_HISTORY_LIMIT`] rows.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the rows cannot be read.
    #[tracing::instrument(skip(self, window), fields(class = %R::CLASS, start = %window.start(), end = %window.end()))]
    pub async fn history<R>(
        &self,
        device_id: &DeviceId,
        window: TimeWindow,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryRecord<R>>, ChargeWatchError>
    where
        R: Reading,
        S: HistoryStore<R>,
    {
        let limit = limit.map_or(MAX_HISTORY_LIMIT, |l| l.min(MAX_HISTORY_LIMIT));
        self.store.find_in_window(device_id, window, Some(limit)).await
    }

    /// Number of history rows kept for one device.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the rows cannot be counted.
    pub async fn history_count<R>(&self, device_id: &DeviceId) -> Result<u64, ChargeWatchError>
    where
        R: Reading,
        S: HistoryStore<R>,
    {
        self.store.count_for(device_id).await
    }
}

fn status_entity(class: DeviceClass) -> &'static str {
    match class {
        DeviceClass::Meter => "MeterStatus",
        DeviceClass::Vehicle => "VehicleStatus",
    }
}
