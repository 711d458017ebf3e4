use std::future::Future;

use outbox_postgres::outbox::OutboxRow;

use crate::error::OutboxResult;

/// Trait for durable stores holding the telemetry outbox table.
///
/// A store hands out [`OutboxBatch`] units of work. All reads and status
/// updates of one poll iteration happen inside a single batch, and none of
/// them become visible until the batch commits. A dropped batch discards its
/// updates, which re-exposes the same rows to the next iteration; the cache
/// apply rule makes that replay harmless.
pub trait OutboxStore {
    type Batch: OutboxBatch;

    /// Opens a new unit of work.
    fn begin(&self) -> impl Future<Output = OutboxResult<Self::Batch>> + Send;

    /// Returns the total number of ingested telemetry events.
    fn count_events(&self) -> impl Future<Output = OutboxResult<i64>> + Send;
}

/// A single transactional unit of work against the outbox table.
pub trait OutboxBatch: Send {
    /// Fetches up to `limit` rows that have not been processed, oldest first.
    fn fetch_unprocessed(
        &mut self,
        limit: i64,
    ) -> impl Future<Output = OutboxResult<Vec<OutboxRow>>> + Send;

    /// Records a propagation failure for one row, incrementing its attempt
    /// counter and keeping it eligible for retry.
    fn mark_failed(
        &mut self,
        outbox_id: i64,
        error: &str,
    ) -> impl Future<Output = OutboxResult<()>> + Send;

    /// Marks the given rows processed in bulk, returning how many changed.
    fn mark_processed(
        &mut self,
        outbox_ids: &[i64],
    ) -> impl Future<Output = OutboxResult<u64>> + Send;

    /// Commits all updates made through this batch.
    fn commit(self) -> impl Future<Output = OutboxResult<()>> + Send;
}
