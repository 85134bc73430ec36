//! Partition lifecycle: provisioning ahead of time and retiring old days.
//!
//! History writes fail with a missing-partition error instead of creating
//! partitions on the fly, so the days that will receive data must be
//! provisioned before readings arrive.

use chargewatch_domain::error::ChargeWatchError;
use chargewatch_domain::partition::{Detached, PartitionInfo, PartitionKey, PartitionOutcome};
use chargewatch_domain::reading::DeviceClass;
use chrono::{Days, NaiveDate};

use crate::ports::PartitionCatalog;

/// Longest provisioning horizon, in days after today.
pub const MAX_DAYS_AHEAD: u32 = 366;

/// Counts produced by [`PartitionLifecycle::provision_ahead`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionSummary {
    pub created: usize,
    pub already_existed: usize,
}

/// Result of one maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub provisioned: ProvisionSummary,
    pub retired: Vec<Detached>,
}

/// Application service managing history partitions for both device classes.
pub struct PartitionLifecycle<P> {
    catalog: P,
}

impl<P: PartitionCatalog> PartitionLifecycle<P> {
    /// Create a new service backed by `catalog`.
    pub fn new(catalog: P) -> Self {
        Self { catalog }
    }

    /// Create the partition of `class` covering `date` if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ChargeWatchError::PartitionRetired`] for a retired day, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_partition(
        &self,
        class: DeviceClass,
        date: NaiveDate,
    ) -> Result<PartitionOutcome, ChargeWatchError> {
        let key = PartitionKey::new(class, date);
        let outcome = self.catalog.ensure(key).await?;
        if outcome == PartitionOutcome::Created {
            tracing::info!(table = %key.table_name(), "partition created");
        }
        Ok(outcome)
    }

    /// Retire the partition of `class` covering `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ChargeWatchError::NotFound`] when the partition never
    /// existed, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn retire_partition(
        &self,
        class: DeviceClass,
        date: NaiveDate,
    ) -> Result<Detached, ChargeWatchError> {
        let detached = self.catalog.retire(PartitionKey::new(class, date)).await?;
        tracing::info!(archived_as = %detached.archived_as, "partition retired");
        Ok(detached)
    }

    /// Every known partition of `class`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the catalog cannot be read.
    pub async fn list_partitions(
        &self,
        class: DeviceClass,
    ) -> Result<Vec<PartitionInfo>, ChargeWatchError> {
        self.catalog.list(class).await
    }

    /// Ensure partitions exist for `today` and the following `days_ahead`
    /// days, for every device class.
    ///
    /// Days that were already retired are skipped, and `days_ahead` is
    /// clamped to [`MAX_DAYS_AHEAD`].
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    #[tracing::instrument(skip(self))]
    pub async fn provision_ahead(
        &self,
        today: NaiveDate,
        days_ahead: u32,
    ) -> Result<ProvisionSummary, ChargeWatchError> {
        let days_ahead = days_ahead.min(MAX_DAYS_AHEAD);
        let mut summary = ProvisionSummary::default();
        for class in DeviceClass::ALL {
            let mut key = PartitionKey::new(class, today);
            for _ in 0..=days_ahead {
                match self.catalog.ensure(key).await {
                    Ok(PartitionOutcome::Created) => summary.created += 1,
                    Ok(PartitionOutcome::AlreadyExists) => summary.already_existed += 1,
                    Err(ChargeWatchError::PartitionRetired(_)) => {
                        tracing::debug!(partition = %key, "skipping retired day");
                    }
                    Err(err) => return Err(err),
                }
                key = key.next();
            }
        }
        tracing::info!(
            created = summary.created,
            already_existed = summary.already_existed,
            "partitions provisioned"
        );
        Ok(summary)
    }

    /// Retire every active partition whose day is strictly before `horizon`.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered. Partitions retired
    /// before the failure stay retired.
    #[tracing::instrument(skip(self))]
    pub async fn retire_before(&self, horizon: NaiveDate) -> Result<Vec<Detached>, ChargeWatchError> {
        let mut retired = Vec::new();
        for class in DeviceClass::ALL {
            let expired = self
                .catalog
                .list(class)
                .await?
                .into_iter()
                .filter(|info| info.is_active() && info.key.date < horizon);
            for info in expired {
                retired.push(self.catalog.retire(info.key).await?);
            }
        }
        if !retired.is_empty() {
            tracing::info!(count = retired.len(), "partitions retired");
        }
        Ok(retired)
    }

    /// One maintenance pass: provision `days_ahead` days from `today` and
    /// retire days older than `retention_days`.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub async fn run_maintenance(
        &self,
        today: NaiveDate,
        days_ahead: u32,
        retention_days: u32,
    ) -> Result<MaintenanceReport, ChargeWatchError> {
        let provisioned = self.provision_ahead(today, days_ahead).await?;
        let retired = match today.checked_sub_days(Days::new(u64::from(retention_days))) {
            Some(horizon) => self.retire_before(horizon).await?,
            None => Vec::new(),
        };
        Ok(MaintenanceReport {
            provisioned,
            retired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chargewatch_domain::error::{NotFoundError, PartitionRetiredError};
    use chargewatch_domain::time::now;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryCatalog {
        partitions: Mutex<BTreeMap<PartitionKey, PartitionInfo>>,
    }

    impl PartitionCatalog for InMemoryCatalog {
        async fn ensure(&self, key: PartitionKey) -> Result<PartitionOutcome, ChargeWatchError> {
            let mut partitions = self.partitions.lock().unwrap();
            match partitions.get(&key) {
                Some(info) if !info.is_active() => Err(PartitionRetiredError {
                    class: key.class,
                    date: key.date,
                }
                .into()),
                Some(_) => Ok(PartitionOutcome::AlreadyExists),
                None => {
                    partitions.insert(
                        key,
                        PartitionInfo {
                            key,
                            table_name: key.table_name(),
                            range_start: key.range_start(),
                            range_end: key.range_end(),
                            created_at: now(),
                            retired_at: None,
                        },
                    );
                    Ok(PartitionOutcome::Created)
                }
            }
        }

        async fn retire(&self, key: PartitionKey) -> Result<Detached, ChargeWatchError> {
            let mut partitions = self.partitions.lock().unwrap();
            let info = partitions.get_mut(&key).ok_or_else(|| NotFoundError {
                entity: "Partition",
                id: key.to_string(),
            })?;
            if info.retired_at.is_none() {
                info.retired_at = Some(now());
            }
            Ok(Detached {
                key,
                archived_as: format!("{}_archived", key.table_name()),
            })
        }

        async fn list(&self, class: DeviceClass) -> Result<Vec<PartitionInfo>, ChargeWatchError> {
            Ok(self
                .partitions
                .lock()
                .unwrap()
                .values()
                .filter(|info| info.key.class == class)
                .cloned()
                .collect())
        }
    }

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn should_create_partition_once() {
        let svc = PartitionLifecycle::new(InMemoryCatalog::default());

        let first = svc
            .ensure_partition(DeviceClass::Meter, day("2025-01-15"))
            .await
            .unwrap();
        let second = svc
            .ensure_partition(DeviceClass::Meter, day("2025-01-15"))
            .await
            .unwrap();

        assert_eq!(first, PartitionOutcome::Created);
        assert_eq!(second, PartitionOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn should_provision_today_and_following_days_for_both_classes() {
        let svc = PartitionLifecycle::new(InMemoryCatalog::default());
        svc.ensure_partition(DeviceClass::Vehicle, day("2025-01-16"))
            .await
            .unwrap();

        let summary = svc.provision_ahead(day("2025-01-15"), 2).await.unwrap();

        assert_eq!(
            summary,
            ProvisionSummary {
                created: 5,
                already_existed: 1,
            }
        );
        let meters = svc.list_partitions(DeviceClass::Meter).await.unwrap();
        let dates: Vec<_> = meters.iter().map(|p| p.key.date).collect();
        assert_eq!(dates, vec![day("2025-01-15"), day("2025-01-16"), day("2025-01-17")]);
    }

    #[tokio::test]
    async fn should_retire_only_days_before_horizon() {
        let svc = PartitionLifecycle::new(InMemoryCatalog::default());
        svc.provision_ahead(day("2025-01-10"), 4).await.unwrap();

        let retired = svc.retire_before(day("2025-01-12")).await.unwrap();

        assert_eq!(retired.len(), 4);
        assert!(retired.iter().all(|d| d.key.date < day("2025-01-12")));
        let active: Vec<_> = svc
            .list_partitions(DeviceClass::Meter)
            .await
            .unwrap()
            .into_iter()
            .filter(PartitionInfo::is_active)
            .map(|p| p.key.date)
            .collect();
        assert_eq!(active, vec![day("2025-01-12"), day("2025-01-13"), day("2025-01-14")]);
    }

    #[tokio::test]
    async fn should_not_retire_twice() {
        let svc = PartitionLifecycle::new(InMemoryCatalog::default());
        svc.provision_ahead(day("2025-01-10"), 0).await.unwrap();

        assert_eq!(svc.retire_before(day("2025-01-11")).await.unwrap().len(), 2);
        assert!(svc.retire_before(day("2025-01-11")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_refuse_to_recreate_retired_day() {
        let svc = PartitionLifecycle::new(InMemoryCatalog::default());
        svc.ensure_partition(DeviceClass::Meter, day("2025-01-10"))
            .await
            .unwrap();
        svc.retire_partition(DeviceClass::Meter, day("2025-01-10"))
            .await
            .unwrap();

        let err = svc
            .ensure_partition(DeviceClass::Meter, day("2025-01-10"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChargeWatchError::PartitionRetired(_)));

        let summary = svc.provision_ahead(day("2025-01-10"), 0).await.unwrap();
        assert_eq!(summary.created, 1);
    }

    #[tokio::test]
    async fn should_return_not_found_when_retiring_unknown_partition() {
        let svc = PartitionLifecycle::new(InMemoryCatalog::default());

        let err = svc
            .retire_partition(DeviceClass::Vehicle, day("2025-01-10"))
            .await
            .unwrap_err();

        assert!(matches!(err, ChargeWatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_provision_and_retire_in_one_maintenance_pass() {
        let svc = PartitionLifecycle::new(InMemoryCatalog::default());
        svc.provision_ahead(day("2025-01-01"), 0).await.unwrap();

        let report = svc.run_maintenance(day("2025-01-15"), 1, 7).await.unwrap();

        assert_eq!(report.provisioned.created, 4);
        assert_eq!(report.retired.len(), 2);
    }

    #[tokio::test]
    async fn should_clamp_provisioning_horizon() {
        let svc = PartitionLifecycle::new(InMemoryCatalog::default());

        let summary = svc.provision_ahead(day("2025-01-15"), u32::MAX).await.unwrap();

        let per_class = usize::try_from(MAX_DAYS_AHEAD).unwrap() + 1;
        assert_eq!(summary.created, 2 * per_class);
        let meters = svc.list_partitions(DeviceClass::Meter).await.unwrap();
        assert_eq!(meters.last().unwrap().key.date, day("2026-01-16"));
    }
}
