//! Poller worker that drains the outbox table into the latest-value cache.
//!
//! Each iteration runs inside a single store batch: fetch a bounded set of
//! unprocessed rows, apply each one to the cache under the monotonic-freshness
//! rule, record per-row failures, bulk-mark the applied rows processed, and
//! commit. A failing row never blocks the rows around it, and a failing
//! iteration never stops the loop; the next tick starts over from the
//! unprocessed set.

use std::time::Duration;

use metrics::{counter, gauge};
use outbox_config::shared::PollerConfig;
use outbox_postgres::outbox::OutboxRow;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::cache::{ApplyOutcome, LatestCache};
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, OutboxError, OutboxResult};
use crate::metrics::{
    APPLY_OUTCOME_LABEL, OUTBOX_CACHE_APPLIES_TOTAL, OUTBOX_ITERATION_ERRORS_TOTAL,
    OUTBOX_LAST_BATCH_SIZE, OUTBOX_POLL_ITERATIONS_TOTAL, OUTBOX_ROWS_FAILED_TOTAL,
    OUTBOX_ROWS_PROCESSED_TOTAL,
};
use crate::outbox_error;
use crate::store::{OutboxBatch, OutboxStore};

/// Maximum length of an error message persisted in `last_error`.
const MAX_ERROR_LEN: usize = 512;

/// Handle to a running poller worker.
#[derive(Debug)]
pub struct OutboxPollerHandle {
    join_handle: JoinHandle<OutboxResult<()>>,
}

impl OutboxPollerHandle {
    /// Waits for the poller worker to complete.
    ///
    /// Returns `Ok(())` if the worker shut down gracefully, or an error if it
    /// panicked.
    pub async fn wait(self) -> OutboxResult<()> {
        match self.join_handle.await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "poller worker task panicked");
                Err(outbox_error!(
                    ErrorKind::PollerWorkerPanic,
                    "The poller worker task panicked",
                    err.to_string()
                ))
            }
        }
    }
}

/// Worker that periodically propagates outbox rows into the cache.
pub struct OutboxPollerWorker<S, C> {
    store: S,
    cache: C,
    config: PollerConfig,
    shutdown_rx: ShutdownRx,
}

impl<S, C> OutboxPollerWorker<S, C>
where
    S: OutboxStore + Send + Sync + 'static,
    C: LatestCache + Send + Sync + 'static,
{
    pub fn new(store: S, cache: C, config: PollerConfig, shutdown_rx: ShutdownRx) -> Self {
        Self {
            store,
            cache,
            config,
            shutdown_rx,
        }
    }

    /// Starts the poller worker in a background task.
    pub fn start(self) -> OutboxPollerHandle {
        let join_handle = tokio::spawn(self.run());

        OutboxPollerHandle { join_handle }
    }

    /// Main worker loop, polls until shutdown is signaled.
    async fn run(self) -> OutboxResult<()> {
        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval_ms,
            "starting outbox poller"
        );

        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms));
        // Skip missed ticks instead of bursting after a slow iteration.
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    counter!(OUTBOX_POLL_ITERATIONS_TOTAL).increment(1);

                    if let Err(err) = self.run_iteration().await {
                        counter!(OUTBOX_ITERATION_ERRORS_TOTAL).increment(1);
                        warn!(error = %err, "poll iteration failed, rows stay unprocessed until the next tick");
                    }
                }
                _ = self.shutdown_rx.wait_for_shutdown() => {
                    info!("outbox poller received shutdown signal");
                    return Ok(());
                }
            }
        }
    }

    /// Runs a single poll iteration.
    ///
    /// Exposed so tests can drive iterations deterministically without the
    /// timer loop.
    pub async fn run_iteration(&self) -> OutboxResult<()> {
        self.sync_event_count().await;

        let mut batch = self.store.begin().await?;

        let rows = batch.fetch_unprocessed(self.config.batch_size).await?;
        gauge!(OUTBOX_LAST_BATCH_SIZE).set(rows.len() as f64);

        if rows.is_empty() {
            batch.commit().await?;
            return Ok(());
        }

        debug!(rows = rows.len(), "propagating outbox rows");

        let mut applied_ids = Vec::with_capacity(rows.len());
        for row in &rows {
            match self.apply_row(row).await {
                Ok(outcome) => {
                    counter!(
                        OUTBOX_CACHE_APPLIES_TOTAL,
                        APPLY_OUTCOME_LABEL => outcome.as_str()
                    )
                    .increment(1);
                    applied_ids.push(row.outbox_id);
                }
                Err(err) => {
                    counter!(OUTBOX_ROWS_FAILED_TOTAL).increment(1);
                    warn!(
                        outbox_id = row.outbox_id,
                        device_uuid = %row.device_uuid,
                        error = %err,
                        "failed to propagate outbox row"
                    );

                    let message = truncate_error(&err);
                    batch.mark_failed(row.outbox_id, &message).await?;
                }
            }
        }

        if !applied_ids.is_empty() {
            let updated = batch.mark_processed(&applied_ids).await?;
            counter!(OUTBOX_ROWS_PROCESSED_TOTAL).increment(updated);
        }

        batch.commit().await?;

        Ok(())
    }

    /// Applies one row to the cache.
    async fn apply_row(&self, row: &OutboxRow) -> OutboxResult<ApplyOutcome> {
        self.cache
            .apply_if_newer(&row.device_uuid, row.telemetry_event_id, &row.payload)
            .await
    }

    /// Refreshes the event count in the cache.
    ///
    /// Best effort: a failure here is logged and never aborts the iteration,
    /// the count is informational only.
    async fn sync_event_count(&self) {
        let count = match self.store.count_events().await {
            Ok(count) => count,
            Err(err) => {
                debug!(error = %err, "failed to read telemetry event count");
                return;
            }
        };

        if let Err(err) = self.cache.set_event_count(count).await {
            debug!(error = %err, "failed to refresh telemetry event count in cache");
        }
    }
}

/// Renders an error for the `last_error` column, bounded to [`MAX_ERROR_LEN`].
fn truncate_error(err: &OutboxError) -> String {
    let mut message = err.to_string();
    if message.len() > MAX_ERROR_LEN {
        let mut cut = MAX_ERROR_LEN;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_error_bounds_long_messages() {
        let detail = "x".repeat(2 * MAX_ERROR_LEN);
        let err = outbox_error!(
            ErrorKind::CacheOperationFailed,
            "A cache operation failed",
            detail
        );

        let message = truncate_error(&err);
        assert!(message.len() <= MAX_ERROR_LEN);
    }

    #[test]
    fn truncate_error_keeps_short_messages() {
        let err = outbox_error!(ErrorKind::CacheOperationFailed, "A cache operation failed");
        let message = truncate_error(&err);

        assert!(message.contains("CacheOperationFailed"));
    }
}
