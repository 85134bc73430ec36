//! `SQLite` implementation of [`PartitionCatalog`].
//!
//! Each partition is a plain table named after its class and day, with a
//! `CHECK` constraint pinning its rows to that day and two indexes: one on
//! `(device_id, ts)` for device-scoped reads and one on `ts` for class-wide
//! scans. Retiring renames the table out of the active set.

use std::str::FromStr;

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use chargewatch_app::ports::PartitionCatalog;
use chargewatch_domain::error::{ChargeWatchError, NotFoundError, PartitionRetiredError};
use chargewatch_domain::partition::{Detached, PartitionInfo, PartitionKey, PartitionOutcome};
use chargewatch_domain::reading::DeviceClass;
use chargewatch_domain::time::{now, to_micros};

use crate::error::{StorageError, decode_error};
use crate::pool::BEGIN_WRITE;
use crate::tables::{decode_micros, history_measurement_defs};

/// Wrapper for converting catalog rows into domain types.
struct Wrapper(PartitionInfo);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let class: String = row.try_get("device_class")?;
        let day: String = row.try_get("day")?;

        let class = DeviceClass::from_str(&class).map_err(decode_error)?;
        let date = NaiveDate::from_str(&day).map_err(decode_error)?;
        let retired_at = match row.try_get::<Option<i64>, _>("retired_at")? {
            Some(_) => Some(decode_micros(row, "retired_at")?),
            None => None,
        };

        Ok(Self(PartitionInfo {
            key: PartitionKey::new(class, date),
            table_name: row.try_get("table_name")?,
            range_start: decode_micros(row, "range_start")?,
            range_end: decode_micros(row, "range_end")?,
            created_at: decode_micros(row, "created_at")?,
            retired_at,
        }))
    }
}

const SELECT_ONE: &str = r"
    SELECT * FROM history_partitions
    WHERE device_class = ? AND day = ?
";

const SELECT_BY_CLASS: &str = r"
    SELECT * FROM history_partitions
    WHERE device_class = ?
    ORDER BY day ASC
";

const INSERT: &str = r"
    INSERT INTO history_partitions (device_class, day, table_name, range_start, range_end, created_at)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT (device_class, day) DO NOTHING
";

const MARK_RETIRED: &str = r"
    UPDATE history_partitions
    SET retired_at = ?, table_name = ?
    WHERE device_class = ? AND day = ?
";

/// `SQLite`-backed partition catalog.
#[derive(Clone)]
pub struct SqlitePartitionCatalog {
    pool: SqlitePool,
}

impl SqlitePartitionCatalog {
    /// Create a new catalog using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn archive_name(table: &str) -> String {
    format!("{table}_archived")
}

impl PartitionCatalog for SqlitePartitionCatalog {
    async fn ensure(&self, key: PartitionKey) -> Result<PartitionOutcome, ChargeWatchError> {
        let mut tx = self
            .pool
            .begin_with(BEGIN_WRITE)
            .await
            .map_err(StorageError::from)?;

        let existing: Option<Wrapper> = sqlx::query_as(SELECT_ONE)
            .bind(key.class.as_str())
            .bind(key.date.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        match existing {
            Some(Wrapper(info)) if !info.is_active() => {
                return Err(PartitionRetiredError {
                    class: key.class,
                    date: key.date,
                }
                .into());
            }
            Some(_) => return Ok(PartitionOutcome::AlreadyExists),
            None => {}
        }

        let table = key.table_name();
        let start = to_micros(key.range_start());
        let end = to_micros(key.range_end());
        let ddl = [
            format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY NOT NULL,
                    device_id TEXT NOT NULL,
                    {columns},
                    ts INTEGER NOT NULL CHECK (ts >= {start} AND ts < {end}),
                    data_quality TEXT NOT NULL DEFAULT 'valid',
                    created_at INTEGER NOT NULL
                )",
                columns = history_measurement_defs(key.class),
            ),
            format!("CREATE INDEX IF NOT EXISTS {table}_device_ts ON {table} (device_id, ts)"),
            format!("CREATE INDEX IF NOT EXISTS {table}_ts ON {table} (ts)"),
        ];
        for statement in &ddl {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        let inserted = sqlx::query(INSERT)
            .bind(key.class.as_str())
            .bind(key.date.to_string())
            .bind(&table)
            .bind(start)
            .bind(end)
            .bind(to_micros(now()))
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;

        Ok(if inserted.rows_affected() == 1 {
            PartitionOutcome::Created
        } else {
            PartitionOutcome::AlreadyExists
        })
    }

    async fn retire(&self, key: PartitionKey) -> Result<Detached, ChargeWatchError> {
        let mut tx = self
            .pool
            .begin_with(BEGIN_WRITE)
            .await
            .map_err(StorageError::from)?;

        let existing: Option<Wrapper> = sqlx::query_as(SELECT_ONE)
            .bind(key.class.as_str())
            .bind(key.date.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        let Some(Wrapper(info)) = existing else {
            return Err(NotFoundError {
                entity: "Partition",
                id: key.to_string(),
            }
            .into());
        };
        if !info.is_active() {
            return Ok(Detached {
                key,
                archived_as: info.table_name,
            });
        }

        let archived_as = archive_name(&info.table_name);
        sqlx::query(&format!(
            "ALTER TABLE {} RENAME TO {archived_as}",
            info.table_name
        ))
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        sqlx::query(MARK_RETIRED)
            .bind(to_micros(now()))
            .bind(&archived_as)
            .bind(key.class.as_str())
            .bind(key.date.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;

        Ok(Detached { key, archived_as })
    }

    async fn list(&self, class: DeviceClass) -> Result<Vec<PartitionInfo>, ChargeWatchError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_CLASS)
            .bind(class.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> (SqlitePartitionCatalog, SqlitePool) {
        let db = Config::new("sqlite::memory:").build().await.unwrap();
        let pool = db.pool().clone();
        (SqlitePartitionCatalog::new(pool.clone()), pool)
    }

    fn key(class: DeviceClass, day: &str) -> PartitionKey {
        PartitionKey::new(class, day.parse().unwrap())
    }

    async fn indexes_of(pool: &SqlitePool, table: &str) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ? ORDER BY name",
        )
        .bind(table)
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn should_create_partition_table_with_both_indexes() {
        let (catalog, pool) = setup().await;

        let outcome = catalog
            .ensure(key(DeviceClass::Meter, "2025-01-15"))
            .await
            .unwrap();

        assert_eq!(outcome, PartitionOutcome::Created);
        assert_eq!(
            indexes_of(&pool, "meter_history_p20250115").await,
            vec![
                "meter_history_p20250115_device_ts".to_string(),
                "meter_history_p20250115_ts".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn should_report_existing_partition_on_second_ensure() {
        let (catalog, _pool) = setup().await;
        let key = key(DeviceClass::Vehicle, "2025-01-15");

        catalog.ensure(key).await.unwrap();
        let outcome = catalog.ensure(key).await.unwrap();

        assert_eq!(outcome, PartitionOutcome::AlreadyExists);
        assert_eq!(catalog.list(DeviceClass::Vehicle).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_rows_outside_the_partition_day() {
        let (catalog, pool) = setup().await;
        let key = key(DeviceClass::Meter, "2025-01-15");
        catalog.ensure(key).await.unwrap();

        let result = sqlx::query(
            "INSERT INTO meter_history_p20250115 (id, device_id, kwh_consumed_ac, voltage, ts, created_at) VALUES (1, 'M', 1.0, 230.0, ?, 0)",
        )
        .bind(to_micros(key.range_end()))
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_rename_table_when_retiring() {
        let (catalog, pool) = setup().await;
        let key = key(DeviceClass::Meter, "2025-01-15");
        catalog.ensure(key).await.unwrap();

        let detached = catalog.retire(key).await.unwrap();

        assert_eq!(detached.archived_as, "meter_history_p20250115_archived");
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'meter_history_%'",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["meter_history_p20250115_archived".to_string()]);

        let listed = catalog.list(DeviceClass::Meter).await.unwrap();
        assert!(!listed[0].is_active());
        assert_eq!(listed[0].table_name, detached.archived_as);
    }

    #[tokio::test]
    async fn should_retire_idempotently() {
        let (catalog, _pool) = setup().await;
        let key = key(DeviceClass::Meter, "2025-01-15");
        catalog.ensure(key).await.unwrap();

        let first = catalog.retire(key).await.unwrap();
        let second = catalog.retire(key).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn should_refuse_to_recreate_retired_partition() {
        let (catalog, _pool) = setup().await;
        let key = key(DeviceClass::Meter, "2025-01-15");
        catalog.ensure(key).await.unwrap();
        catalog.retire(key).await.unwrap();

        let err = catalog.ensure(key).await.unwrap_err();

        assert!(matches!(err, ChargeWatchError::PartitionRetired(_)));
    }

    #[tokio::test]
    async fn should_return_not_found_when_retiring_unknown_partition() {
        let (catalog, _pool) = setup().await;

        let err = catalog
            .retire(key(DeviceClass::Vehicle, "2025-01-15"))
            .await
            .unwrap_err();

        assert!(matches!(err, ChargeWatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_list_partitions_oldest_first_per_class() {
        let (catalog, _pool) = setup().await;
        for day in ["2025-01-17", "2025-01-15", "2025-01-16"] {
            catalog.ensure(key(DeviceClass::Meter, day)).await.unwrap();
        }
        catalog
            .ensure(key(DeviceClass::Vehicle, "2025-01-15"))
            .await
            .unwrap();

        let listed = catalog.list(DeviceClass::Meter).await.unwrap();

        let days: Vec<String> = listed.iter().map(|p| p.key.date.to_string()).collect();
        assert_eq!(days, vec!["2025-01-15", "2025-01-16", "2025-01-17"]);
        assert_eq!(listed[0].range_start, key(DeviceClass::Meter, "2025-01-15").range_start());
    }
}
