//! Partition catalog port: physical lifecycle of history partitions.

use std::future::Future;

use chargewatch_domain::error::ChargeWatchError;
use chargewatch_domain::partition::{Detached, PartitionInfo, PartitionKey, PartitionOutcome};
use chargewatch_domain::reading::DeviceClass;

/// Creates, retires and lists history partitions.
pub trait PartitionCatalog {
    /// Make sure the partition for `key` exists and accepts writes.
    ///
    /// Fails with [`ChargeWatchError::PartitionRetired`] for a day that was
    /// already retired.
    fn ensure(
        &self,
        key: PartitionKey,
    ) -> impl Future<Output = Result<PartitionOutcome, ChargeWatchError>> + Send;

    /// Detach the partition for `key` from the active set, keeping its rows
    /// in an archive. Retiring an already retired partition is a no-op that
    /// reports the existing archive.
    ///
    /// Fails with [`ChargeWatchError::NotFound`] when no such partition exists.
    fn retire(
        &self,
        key: PartitionKey,
    ) -> impl Future<Output = Result<Detached, ChargeWatchError>> + Send;

    /// Every known partition of `class`, oldest first.
    fn list(
        &self,
        class: DeviceClass,
    ) -> impl Future<Output = Result<Vec<PartitionInfo>, ChargeWatchError>> + Send;
}
