//! Ingest service: the dual-path writer.
//!
//! Every reading lands in two places: the current status row of its device
//! (overwritten) and a new history row (appended). The store applies both
//! inside one unit of work; this service decides how readings are grouped
//! into units and reports progress when a batch fails part-way.

use std::time::{Duration, Instant};

use chargewatch_domain::error::ChargeWatchError;
use chargewatch_domain::history::HistoryId;
use chargewatch_domain::id::DeviceId;
use chargewatch_domain::reading::{DeviceClass, Reading};
use tracing::Instrument;
use uuid::Uuid;

use crate::deadline;
use crate::ports::{DualPathStore, UnitReceipt};

/// Readings per unit of work when a batch is split.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Largest unit of work; larger settings are clamped to it.
pub const MAX_CHUNK_SIZE: usize = 10_000;

/// Maximum execution time of one unit of work.
pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for [`IngestService`].
#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    pub chunk_size: usize,
    pub unit_timeout: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            unit_timeout: DEFAULT_UNIT_TIMEOUT,
        }
    }
}

/// Acknowledgement of a single applied reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub class: DeviceClass,
    pub device_id: DeviceId,
    pub history_id: HistoryId,
}

/// Acknowledgement of a fully applied batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAck {
    pub batch_id: Uuid,
    pub class: DeviceClass,
    pub accepted: usize,
    pub chunks: usize,
}

/// A batch stopped at `failed_chunk`; every earlier chunk is committed.
#[derive(Debug, thiserror::Error)]
#[error(
    "batch {batch_id} failed at chunk {failed_chunk}/{total_chunks} after committing {committed_readings} readings"
)]
pub struct BatchWriteError {
    pub batch_id: Uuid,
    pub class: DeviceClass,
    /// Chunks durably committed before the failure.
    pub committed_chunks: usize,
    /// Readings contained in the committed chunks.
    pub committed_readings: usize,
    /// 1-based index of the chunk that failed.
    pub failed_chunk: usize,
    pub total_chunks: usize,
    #[source]
    pub source: ChargeWatchError,
}

/// Application service applying readings to both storage representations.
///
/// No locking happens here: concurrent callers each get their own unit of
/// work, and per-device last-write-wins is left to the store's row-level
/// upsert.
pub struct IngestService<S> {
    store: S,
    settings: IngestSettings,
}

impl<S> IngestService<S> {
    /// Create a new service backed by the given store.
    pub fn new(store: S, settings: IngestSettings) -> Self {
        let chunk_size = settings.chunk_size.clamp(1, MAX_CHUNK_SIZE);
        Self {
            store,
            settings: IngestSettings {
                chunk_size,
                ..settings
            },
        }
    }

    /// Effective settings.
    pub fn settings(&self) -> IngestSettings {
        self.settings
    }

    /// Apply one reading as its own unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`ChargeWatchError::MissingPartition`] when the reading's day
    /// has no partition, [`ChargeWatchError::Transient`] on connection
    /// problems or when the unit exceeds its deadline, or another storage
    /// error. In every error case neither store was changed.
    #[tracing::instrument(skip(self, reading), fields(class = %R::CLASS, device_id = %reading.device_id()))]
    pub async fn apply_reading<R>(&self, reading: R) -> Result<Ack, ChargeWatchError>
    where
        R: Reading,
        S: DualPathStore<R>,
    {
        let started = Instant::now();
        let receipt = self
            .commit(std::slice::from_ref(&reading))
            .await
            .inspect_err(|err| {
                tracing::warn!(
                    error = %err,
                    retryable = err.is_retryable(),
                    elapsed_ms = elapsed_ms(started),
                    "reading rejected"
                );
            })?;

        tracing::debug!(
            history_id = receipt.first_history_id,
            elapsed_ms = elapsed_ms(started),
            "reading applied"
        );

        Ok(Ack {
            class: R::CLASS,
            device_id: reading.device_id().clone(),
            history_id: receipt.first_history_id,
        })
    }

    /// Apply a batch of any size, chunk by chunk.
    ///
    /// Chunks run strictly one after the other. Each chunk is atomic on its
    /// own; the first failing chunk aborts the rest of the batch. Nothing is
    /// retried here.
    ///
    /// # Errors
    ///
    /// Returns [`BatchWriteError`] carrying how many chunks and readings were
    /// committed before the failure and the error of the failing chunk.
    pub async fn apply_batch<R>(&self, readings: Vec<R>) -> Result<BatchAck, BatchWriteError>
    where
        R: Reading,
        S: DualPathStore<R>,
    {
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let total_chunks = readings.len().div_ceil(self.settings.chunk_size);
        let span = tracing::info_span!(
            "apply_batch",
            %batch_id,
            class = %R::CLASS,
            readings = readings.len(),
            total_chunks
        );

        async {
            let mut committed_readings = 0;
            for (idx, chunk) in readings.chunks(self.settings.chunk_size).enumerate() {
                let chunk_started = Instant::now();
                match self.commit(chunk).await {
                    Ok(receipt) => {
                        committed_readings += receipt.history_rows;
                        tracing::debug!(
                            chunk = idx + 1,
                            history_rows = receipt.history_rows,
                            status_rows = receipt.status_rows,
                            elapsed_ms = elapsed_ms(chunk_started),
                            "chunk committed"
                        );
                    }
                    Err(source) => {
                        tracing::error!(
                            error = %source,
                            retryable = source.is_retryable(),
                            chunk = idx + 1,
                            committed_chunks = idx,
                            committed_readings,
                            elapsed_ms = elapsed_ms(started),
                            "batch aborted"
                        );
                        return Err(BatchWriteError {
                            batch_id,
                            class: R::CLASS,
                            committed_chunks: idx,
                            committed_readings,
                            failed_chunk: idx + 1,
                            total_chunks,
                            source,
                        });
                    }
                }
            }

            tracing::info!(
                accepted = committed_readings,
                elapsed_ms = elapsed_ms(started),
                "batch applied"
            );

            Ok(BatchAck {
                batch_id,
                class: R::CLASS,
                accepted: committed_readings,
                chunks: total_chunks,
            })
        }
        .instrument(span)
        .await
    }

    async fn commit<R>(&self, readings: &[R]) -> Result<UnitReceipt, ChargeWatchError>
    where
        R: Reading,
        S: DualPathStore<R>,
    {
        deadline::within(
            "unit of work",
            self.settings.unit_timeout,
            self.store.commit_unit(readings),
        )
        .await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
