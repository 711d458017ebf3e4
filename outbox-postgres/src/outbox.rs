use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

/// Status of an outbox row as stored in the database.
///
/// A row only moves forward: `PENDING → PROCESSED`, or through `FAILED` and
/// back to `PROCESSED` on a later retry. It never regresses from `PROCESSED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(type_name = "outbox_status", rename_all = "UPPERCASE")]
pub enum OutboxStatus {
    Pending,
    Failed,
    Processed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Failed => "FAILED",
            OutboxStatus::Processed => "PROCESSED",
        }
    }
}

/// A row from the `telemetry_latest_outbox` work queue.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxRow {
    /// Primary key, insertion ordered.
    pub outbox_id: i64,
    /// Id of the originating telemetry event; globally increasing, used as
    /// the freshness comparator for cache writes.
    pub telemetry_event_id: i64,
    pub device_uuid: Uuid,
    /// Snapshot of the event payload, device-defined schema.
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxRow {
    /// Builds a fresh `PENDING` row, useful for tests and tooling. Production
    /// rows are inserted by the ingestion path in the same transaction as the
    /// telemetry event itself.
    pub fn pending(
        outbox_id: i64,
        telemetry_event_id: i64,
        device_uuid: Uuid,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            outbox_id,
            telemetry_event_id,
            device_uuid,
            payload,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at,
            processed_at: None,
        }
    }
}

/// Fetches up to `limit` rows that have not reached `PROCESSED`, oldest first.
///
/// Oldest-first ordering keeps long-stuck rows from being starved by newer
/// arrivals; correctness does not depend on it.
pub async fn fetch_unprocessed_rows(
    conn: &mut PgConnection,
    limit: i64,
) -> sqlx::Result<Vec<OutboxRow>> {
    let rows = sqlx::query_as::<_, OutboxRow>(
        r#"
        select outbox_id, telemetry_event_id, device_uuid, payload, status,
               attempts, last_error, created_at, processed_at
        from telemetry_latest_outbox
        where status <> $1
        order by created_at asc
        limit $2
        "#,
    )
    .bind(OutboxStatus::Processed)
    .bind(limit)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Records a propagation failure for a single row.
///
/// Increments the attempt counter and stores the error; the row stays
/// eligible for the next fetch because `FAILED` does not match `PROCESSED`.
pub async fn mark_row_failed(
    conn: &mut PgConnection,
    outbox_id: i64,
    error: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        update telemetry_latest_outbox
        set status = $1, attempts = attempts + 1, last_error = $2
        where outbox_id = $3
        "#,
    )
    .bind(OutboxStatus::Failed)
    .bind(error)
    .bind(outbox_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Marks a set of rows `PROCESSED` in a single bulk update.
pub async fn mark_rows_processed(
    conn: &mut PgConnection,
    outbox_ids: &[i64],
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        update telemetry_latest_outbox
        set status = $1, processed_at = now()
        where outbox_id = any($2)
        "#,
    )
    .bind(OutboxStatus::Processed)
    .bind(outbox_ids)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Counts all ingested telemetry events.
pub async fn count_telemetry_events(conn: &mut PgConnection) -> sqlx::Result<i64> {
    let count: i64 = sqlx::query_scalar("select count(*) from telemetry_event")
        .fetch_one(conn)
        .await?;

    Ok(count)
}
