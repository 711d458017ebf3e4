//! In-memory outbox store for testing and development purposes.

use std::sync::Arc;

use chrono::Utc;
use outbox_postgres::outbox::{OutboxRow, OutboxStatus};
use tokio::sync::Mutex;

use crate::error::OutboxResult;
use crate::store::base::{OutboxBatch, OutboxStore};

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<OutboxRow>,
    event_count: i64,
}

/// [`OutboxStore`] implementation that keeps all rows in memory.
///
/// Batches mimic transaction semantics: updates accumulate on a private copy
/// of the rows and only become visible on commit. Dropping a batch without
/// committing discards its updates, matching a rolled-back transaction.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutboxStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryOutboxStore {
    /// Creates a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row into the outbox table and bumps the event count.
    pub async fn insert_row(&self, row: OutboxRow) {
        let mut inner = self.inner.lock().await;
        inner.rows.push(row);
        inner.event_count += 1;
    }

    /// Returns a copy of all rows, committed state only.
    pub async fn rows(&self) -> Vec<OutboxRow> {
        let inner = self.inner.lock().await;
        inner.rows.clone()
    }

    /// Returns the row with the given id, if present.
    pub async fn row(&self, outbox_id: i64) -> Option<OutboxRow> {
        let inner = self.inner.lock().await;
        inner.rows.iter().find(|row| row.outbox_id == outbox_id).cloned()
    }
}

impl OutboxStore for MemoryOutboxStore {
    type Batch = MemoryOutboxBatch;

    async fn begin(&self) -> OutboxResult<MemoryOutboxBatch> {
        let inner = self.inner.lock().await;

        Ok(MemoryOutboxBatch {
            store: self.inner.clone(),
            rows: inner.rows.clone(),
        })
    }

    async fn count_events(&self) -> OutboxResult<i64> {
        let inner = self.inner.lock().await;

        Ok(inner.event_count)
    }
}

/// A batch operating on a snapshot of the store's rows.
#[derive(Debug)]
pub struct MemoryOutboxBatch {
    store: Arc<Mutex<Inner>>,
    rows: Vec<OutboxRow>,
}

impl OutboxBatch for MemoryOutboxBatch {
    async fn fetch_unprocessed(&mut self, limit: i64) -> OutboxResult<Vec<OutboxRow>> {
        let mut unprocessed: Vec<OutboxRow> = self
            .rows
            .iter()
            .filter(|row| row.status != OutboxStatus::Processed)
            .cloned()
            .collect();
        unprocessed.sort_by_key(|row| row.created_at);
        unprocessed.truncate(limit as usize);

        Ok(unprocessed)
    }

    async fn mark_failed(&mut self, outbox_id: i64, error: &str) -> OutboxResult<()> {
        if let Some(row) = self.rows.iter_mut().find(|row| row.outbox_id == outbox_id) {
            row.status = OutboxStatus::Failed;
            row.attempts += 1;
            row.last_error = Some(error.to_string());
        }

        Ok(())
    }

    async fn mark_processed(&mut self, outbox_ids: &[i64]) -> OutboxResult<u64> {
        let mut updated = 0;
        for row in self.rows.iter_mut() {
            if outbox_ids.contains(&row.outbox_id) {
                row.status = OutboxStatus::Processed;
                row.processed_at = Some(Utc::now());
                updated += 1;
            }
        }

        Ok(updated)
    }

    async fn commit(self) -> OutboxResult<()> {
        let mut inner = self.store.lock().await;
        inner.rows = self.rows;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn pending_row(outbox_id: i64, event_id: i64) -> OutboxRow {
        OutboxRow::pending(outbox_id, event_id, Uuid::new_v4(), json!({"t": 1}), Utc::now())
    }

    #[tokio::test]
    async fn uncommitted_updates_are_discarded() {
        let store = MemoryOutboxStore::new();
        store.insert_row(pending_row(1, 10)).await;

        {
            let mut batch = store.begin().await.unwrap();
            batch.mark_processed(&[1]).await.unwrap();
            // Dropped without commit.
        }

        let row = store.row(1).await.unwrap();
        assert_eq!(row.status, OutboxStatus::Pending);
    }

    #[tokio::test]
    async fn committed_updates_are_visible() {
        let store = MemoryOutboxStore::new();
        store.insert_row(pending_row(1, 10)).await;
        store.insert_row(pending_row(2, 11)).await;

        let mut batch = store.begin().await.unwrap();
        batch.mark_failed(2, "cache unavailable").await.unwrap();
        batch.mark_processed(&[1]).await.unwrap();
        batch.commit().await.unwrap();

        let processed = store.row(1).await.unwrap();
        assert_eq!(processed.status, OutboxStatus::Processed);
        assert!(processed.processed_at.is_some());

        let failed = store.row(2).await.unwrap();
        assert_eq!(failed.status, OutboxStatus::Failed);
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.last_error.as_deref(), Some("cache unavailable"));
    }

    #[tokio::test]
    async fn fetch_respects_limit_and_order() {
        let store = MemoryOutboxStore::new();
        for id in 1..=5 {
            store.insert_row(pending_row(id, id + 100)).await;
        }

        let mut batch = store.begin().await.unwrap();
        let rows = batch.fetch_unprocessed(3).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].outbox_id, 1);
        assert_eq!(store.count_events().await.unwrap(), 5);
    }
}
