//! `SQLite` implementation of the telemetry ports.
//!
//! One [`SqliteTelemetryStore`] serves both reading classes: current status
//! lives in `meter_status` / `vehicle_status`, history in the per-day
//! partition tables listed by `history_partitions`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use chargewatch_app::ports::{
    DualPathStore, HistoryStore, ScanResult, StatusStore, UnitReceipt, WindowScanner,
};
use chargewatch_domain::error::{ChargeWatchError, MissingPartitionError, PartitionRetiredError};
use chargewatch_domain::history::{HistoryId, HistoryRecord};
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::{
    DataQuality, DeviceClass, MeterReading, VehicleReading, last_per_device,
};
use chargewatch_domain::status::CurrentStatus;
use chargewatch_domain::time::{now, to_micros};
use chargewatch_domain::window::{TimeWindow, WindowSums};

use crate::error::StorageError;
use crate::pool::BEGIN_WRITE;
use crate::tables::{ReadingTable, decode_micros, decode_quality};

struct StatusRow<R>(CurrentStatus<R>);

impl<'r, R: ReadingTable> FromRow<'r, SqliteRow> for StatusRow<R> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(CurrentStatus {
            reading: R::decode(row)?,
            data_quality: decode_quality(row)?,
            created_at: decode_micros(row, "created_at")?,
            updated_at: decode_micros(row, "updated_at")?,
        }))
    }
}

struct HistoryRow<R>(HistoryRecord<R>);

impl<'r, R: ReadingTable> FromRow<'r, SqliteRow> for HistoryRow<R> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(HistoryRecord {
            id: row.try_get("id")?,
            reading: R::decode(row)?,
            data_quality: decode_quality(row)?,
            created_at: decode_micros(row, "created_at")?,
        }))
    }
}

const PARTITION_FOR_DAY: &str = r"
    SELECT table_name, retired_at IS NOT NULL
    FROM history_partitions
    WHERE device_class = ? AND day = ?
";

const ACTIVE_PARTITIONS_IN_RANGE: &str = r"
    SELECT table_name FROM history_partitions
    WHERE device_class = ? AND retired_at IS NULL AND range_start <= ? AND range_end > ?
    ORDER BY day ASC
";

const ACTIVE_PARTITIONS: &str = r"
    SELECT table_name FROM history_partitions
    WHERE device_class = ? AND retired_at IS NULL
    ORDER BY day ASC
";

const ALLOCATE_HISTORY_IDS: &str = r"
    UPDATE history_sequences
    SET next_id = next_id + ?
    WHERE device_class = ?
    RETURNING next_id
";

/// `SQLite`-backed store for current status, history and window scans.
#[derive(Clone)]
pub struct SqliteTelemetryStore {
    pool: SqlitePool,
}

impl SqliteTelemetryStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn scan_class<R: ReadingTable>(
        &self,
        device_id: Option<&DeviceId>,
        window: TimeWindow,
    ) -> Result<ScanResult, ChargeWatchError> {
        let (temp_sum, temp_count) = match R::TEMP_COLUMN {
            Some(column) => (format!("TOTAL({column})"), format!("COUNT({column})")),
            None => ("0.0".to_string(), "0".to_string()),
        };
        let filter = if device_id.is_some() {
            "device_id = ? AND ts BETWEEN ? AND ?"
        } else {
            "ts BETWEEN ? AND ?"
        };

        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        let tables = active_partitions_in(&mut tx, R::CLASS, window).await?;

        let mut sums = WindowSums::default();
        for table in &tables {
            let sql = format!(
                "SELECT COUNT(*), TOTAL({energy}), TOTAL({gauge}), {temp_sum}, {temp_count} FROM {table} WHERE {filter}",
                energy = R::ENERGY_COLUMN,
                gauge = R::GAUGE_COLUMN,
            );
            let mut query = sqlx::query_as::<_, (i64, f64, f64, f64, i64)>(&sql);
            if let Some(device_id) = device_id {
                query = query.bind(device_id.as_str());
            }
            let (count, energy_kwh, gauge_sum, temp_sum, temp_count) = query
                .bind(to_micros(window.start()))
                .bind(to_micros(window.end()))
                .fetch_one(&mut *tx)
                .await
                .map_err(StorageError::from)?;

            sums = sums.merge(WindowSums {
                count: u64::try_from(count).unwrap_or_default(),
                energy_kwh,
                gauge_sum,
                temp_sum,
                temp_count: u64::try_from(temp_count).unwrap_or_default(),
            });
        }
        tx.commit().await.map_err(StorageError::from)?;

        Ok(ScanResult {
            sums,
            partitions_scanned: tables.len(),
        })
    }
}

/// Map every day touched by `readings` to its active partition table.
async fn route_partitions<R: ReadingTable>(
    conn: &mut SqliteConnection,
    readings: &[R],
) -> Result<BTreeMap<NaiveDate, String>, ChargeWatchError> {
    let mut routes = BTreeMap::new();
    for reading in readings {
        let date = reading.timestamp().date_naive();
        if routes.contains_key(&date) {
            continue;
        }
        let found: Option<(String, bool)> = sqlx::query_as(PARTITION_FOR_DAY)
            .bind(R::CLASS.as_str())
            .bind(date.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(StorageError::from)?;
        match found {
            Some((table, false)) => {
                routes.insert(date, table);
            }
            Some((_, true)) => {
                return Err(PartitionRetiredError {
                    class: R::CLASS,
                    date,
                }
                .into());
            }
            None => {
                return Err(MissingPartitionError {
                    class: R::CLASS,
                    date,
                }
                .into());
            }
        }
    }
    Ok(routes)
}

/// Bound parameters `SQLite` accepts in one statement.
const MAX_BIND_PARAMETERS: usize = 32_766;

/// Rows per multi-row statement so that one statement stays under
/// [`MAX_BIND_PARAMETERS`]. Status and history rows both bind the
/// measurements plus five bookkeeping values.
fn rows_per_statement<R: ReadingTable>() -> usize {
    MAX_BIND_PARAMETERS / (R::MEASUREMENTS.len() + 5)
}

/// Multi-row upsert of current status; returns the number of devices touched.
async fn upsert_status<R: ReadingTable>(
    conn: &mut SqliteConnection,
    readings: &[R],
) -> Result<usize, StorageError> {
    let latest = last_per_device(readings);
    let written_at = to_micros(now());
    let measurements = R::MEASUREMENTS.join(", ");

    for slice in latest.chunks(rows_per_statement::<R>()) {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "INSERT INTO {} (device_id, {measurements}, ts, data_quality, created_at, updated_at) ",
            R::STATUS_TABLE
        ));
        builder.push_values(slice, |mut row, reading| {
            row.push_bind(reading.device_id().as_str().to_owned());
            reading.push_measurements(&mut row);
            row.push_bind(to_micros(reading.timestamp()))
                .push_bind(DataQuality::Valid.as_str())
                .push_bind(written_at)
                .push_bind(written_at);
        });
        builder.push(" ON CONFLICT (device_id) DO UPDATE SET ");
        let mut assignments = builder.separated(", ");
        for column in R::MEASUREMENTS.iter().chain(&["ts", "data_quality", "updated_at"]) {
            assignments.push(format!("{column} = excluded.{column}"));
        }

        builder.build().execute(&mut *conn).await?;
    }
    Ok(latest.len())
}

/// Reserve `count` consecutive history ids for `class`; returns the first.
async fn allocate_history_ids(
    conn: &mut SqliteConnection,
    class: DeviceClass,
    count: usize,
) -> Result<HistoryId, StorageError> {
    let count = i64::try_from(count).unwrap_or(i64::MAX);
    let next: i64 = sqlx::query_scalar(ALLOCATE_HISTORY_IDS)
        .bind(count)
        .bind(class.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(next - count)
}

/// One multi-row insert per partition touched by the unit.
async fn insert_history<R: ReadingTable>(
    conn: &mut SqliteConnection,
    readings: &[R],
    routes: &BTreeMap<NaiveDate, String>,
    first_id: HistoryId,
) -> Result<(), ChargeWatchError> {
    let written_at = to_micros(now());
    let measurements = R::MEASUREMENTS.join(", ");

    let mut per_table: BTreeMap<&str, Vec<(HistoryId, &R)>> = BTreeMap::new();
    for (reading, id) in readings.iter().zip(first_id..) {
        let date = reading.timestamp().date_naive();
        let table = routes.get(&date).ok_or(MissingPartitionError {
            class: R::CLASS,
            date,
        })?;
        per_table.entry(table.as_str()).or_default().push((id, reading));
    }

    for (table, rows) in per_table {
        for slice in rows.chunks(rows_per_statement::<R>()) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO {table} (id, device_id, {measurements}, ts, data_quality, created_at) "
            ));
            builder.push_values(slice.iter().copied(), |mut row, (id, reading)| {
                row.push_bind(id)
                    .push_bind(reading.device_id().as_str().to_owned());
                reading.push_measurements(&mut row);
                row.push_bind(to_micros(reading.timestamp()))
                    .push_bind(DataQuality::Valid.as_str())
                    .push_bind(written_at);
            });
            builder
                .build()
                .execute(&mut *conn)
                .await
                .map_err(StorageError::from)?;
        }
    }
    Ok(())
}

async fn active_partitions_in(
    conn: &mut SqliteConnection,
    class: DeviceClass,
    window: TimeWindow,
) -> Result<Vec<String>, StorageError> {
    let tables = sqlx::query_scalar(ACTIVE_PARTITIONS_IN_RANGE)
        .bind(class.as_str())
        .bind(to_micros(window.end()))
        .bind(to_micros(window.start()))
        .fetch_all(&mut *conn)
        .await?;
    Ok(tables)
}

impl<R: ReadingTable> DualPathStore<R> for SqliteTelemetryStore {
    async fn commit_unit(&self, readings: &[R]) -> Result<UnitReceipt, ChargeWatchError> {
        if readings.is_empty() {
            return Ok(UnitReceipt {
                history_rows: 0,
                status_rows: 0,
                first_history_id: 0,
            });
        }

        let mut tx = self
            .pool
            .begin_with(BEGIN_WRITE)
            .await
            .map_err(StorageError::from)?;

        let routes = route_partitions(&mut tx, readings).await?;
        let status_rows = upsert_status(&mut tx, readings).await?;
        let first_history_id = allocate_history_ids(&mut tx, R::CLASS, readings.len()).await?;
        insert_history(&mut tx, readings, &routes, first_history_id).await?;

        tx.commit().await.map_err(StorageError::from)?;

        Ok(UnitReceipt {
            history_rows: readings.len(),
            status_rows,
            first_history_id,
        })
    }
}

impl<R: ReadingTable> StatusStore<R> for SqliteTelemetryStore {
    async fn get_status(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<CurrentStatus<R>>, ChargeWatchError> {
        let sql = format!("SELECT * FROM {} WHERE device_id = ?", R::STATUS_TABLE);
        let row: Option<StatusRow<R>> = sqlx::query_as(&sql)
            .bind(device_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }

    async fn list_statuses(&self) -> Result<Vec<CurrentStatus<R>>, ChargeWatchError> {
        let sql = format!("SELECT * FROM {} ORDER BY device_id ASC", R::STATUS_TABLE);
        let rows: Vec<StatusRow<R>> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

impl<R: ReadingTable> HistoryStore<R> for SqliteTelemetryStore {
    async fn find_in_window(
        &self,
        device_id: &DeviceId,
        window: TimeWindow,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryRecord<R>>, ChargeWatchError> {
        let mut remaining = limit.map_or(i64::MAX, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        let tables = active_partitions_in(&mut tx, R::CLASS, window).await?;

        let mut records = Vec::new();
        for table in tables {
            if remaining <= 0 {
                break;
            }
            let sql = format!(
                "SELECT * FROM {table} WHERE device_id = ? AND ts BETWEEN ? AND ? ORDER BY ts ASC, id ASC LIMIT ?"
            );
            let rows: Vec<HistoryRow<R>> = sqlx::query_as(&sql)
                .bind(device_id.as_str())
                .bind(to_micros(window.start()))
                .bind(to_micros(window.end()))
                .bind(remaining)
                .fetch_all(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            remaining -= i64::try_from(rows.len()).unwrap_or(i64::MAX);
            records.extend(rows.into_iter().map(|w| w.0));
        }
        tx.commit().await.map_err(StorageError::from)?;

        Ok(records)
    }

    async fn count_for(&self, device_id: &DeviceId) -> Result<u64, ChargeWatchError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        let tables: Vec<String> = sqlx::query_scalar(ACTIVE_PARTITIONS)
            .bind(R::CLASS.as_str())
            .fetch_all(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        let mut total: u64 = 0;
        for table in tables {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {table} WHERE device_id = ?"
            ))
            .bind(device_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::from)?;
            total += u64::try_from(count).unwrap_or_default();
        }
        tx.commit().await.map_err(StorageError::from)?;

        Ok(total)
    }
}

impl WindowScanner for SqliteTelemetryStore {
    async fn scan(
        &self,
        class: DeviceClass,
        device_id: Option<&DeviceId>,
        window: TimeWindow,
    ) -> Result<ScanResult, ChargeWatchError> {
        match class {
            DeviceClass::Meter => self.scan_class::<MeterReading>(device_id, window).await,
            DeviceClass::Vehicle => self.scan_class::<VehicleReading>(device_id, window).await,
        }
    }
}
