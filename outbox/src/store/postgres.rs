//! Postgres-backed outbox store.

use outbox_postgres::outbox::{
    OutboxRow, count_telemetry_events, fetch_unprocessed_rows, mark_row_failed,
    mark_rows_processed,
};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::OutboxResult;
use crate::store::base::{OutboxBatch, OutboxStore};

/// [`OutboxStore`] implementation backed by a Postgres connection pool.
///
/// Each batch maps to one database transaction, so a poll iteration commits
/// all of its status updates atomically or not at all.
#[derive(Debug, Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OutboxStore for PostgresOutboxStore {
    type Batch = PostgresOutboxBatch;

    async fn begin(&self) -> OutboxResult<PostgresOutboxBatch> {
        let tx = self.pool.begin().await?;

        Ok(PostgresOutboxBatch { tx })
    }

    async fn count_events(&self) -> OutboxResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let count = count_telemetry_events(&mut conn).await?;

        Ok(count)
    }
}

/// A batch bound to a single Postgres transaction.
#[derive(Debug)]
pub struct PostgresOutboxBatch {
    tx: Transaction<'static, Postgres>,
}

impl OutboxBatch for PostgresOutboxBatch {
    async fn fetch_unprocessed(&mut self, limit: i64) -> OutboxResult<Vec<OutboxRow>> {
        let rows = fetch_unprocessed_rows(&mut self.tx, limit).await?;

        Ok(rows)
    }

    async fn mark_failed(&mut self, outbox_id: i64, error: &str) -> OutboxResult<()> {
        mark_row_failed(&mut self.tx, outbox_id, error).await?;

        Ok(())
    }

    async fn mark_processed(&mut self, outbox_ids: &[i64]) -> OutboxResult<u64> {
        let updated = mark_rows_processed(&mut self.tx, outbox_ids).await?;

        Ok(updated)
    }

    async fn commit(self) -> OutboxResult<()> {
        self.tx.commit().await?;

        Ok(())
    }
}
