//! Window scan port: partition-pruned aggregation over history.

use std::future::Future;

use chargewatch_domain::error::ChargeWatchError;
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::DeviceClass;
use chargewatch_domain::window::{TimeWindow, WindowSums};

/// Totals for one window plus how much of the history was touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    pub sums: WindowSums,
    pub partitions_scanned: usize,
}

/// Sums history rows inside a window.
pub trait WindowScanner {
    /// Fold every history row of `class` with a timestamp in `window`
    /// (restricted to `device_id` when given) into [`WindowSums`].
    ///
    /// Only partitions intersecting the window may be read, and within a
    /// partition a device-restricted scan must use the `(device_id, ts)`
    /// ordered access path. An empty window yields empty sums, not an error.
    fn scan(
        &self,
        class: DeviceClass,
        device_id: Option<&DeviceId>,
        window: TimeWindow,
    ) -> impl Future<Output = Result<ScanResult, ChargeWatchError>> + Send;
}
