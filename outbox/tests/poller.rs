//! End-to-end tests for the outbox poller against in-memory backends.

mod support;

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use outbox::cache::memory::MemoryLatestCache;
use outbox::concurrency::shutdown::create_shutdown_channel;
use outbox::store::memory::MemoryOutboxStore;
use outbox::worker::OutboxPollerWorker;
use outbox_config::shared::PollerConfig;
use outbox_postgres::outbox::{OutboxRow, OutboxStatus};
use outbox_telemetry::metrics::init_metrics_handle;
use outbox_telemetry::tracing::init_test_tracing;
use serde_json::json;
use uuid::Uuid;

use crate::support::FlakyCache;

fn row(outbox_id: i64, event_id: i64, device: Uuid, payload: serde_json::Value) -> OutboxRow {
    // Spread created_at so ordering is deterministic.
    let created_at = Utc::now() + TimeDelta::milliseconds(outbox_id);
    OutboxRow::pending(outbox_id, event_id, device, payload, created_at)
}

fn poller_config(batch_size: i64) -> PollerConfig {
    PollerConfig {
        batch_size,
        poll_interval_ms: 10,
    }
}

#[tokio::test]
async fn single_row_is_propagated_and_marked_processed() {
    init_test_tracing();

    let store = MemoryOutboxStore::new();
    let cache = MemoryLatestCache::new();
    let device = Uuid::new_v4();
    store.insert_row(row(1, 42, device, json!({"t": 21.5}))).await;

    let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let worker = OutboxPollerWorker::new(
        store.clone(),
        cache.clone(),
        poller_config(1000),
        shutdown_rx,
    );

    worker.run_iteration().await.unwrap();

    let (version, payload) = cache.latest(&device).await.unwrap();
    assert_eq!(version, 42);
    assert_eq!(payload, json!({"t": 21.5}));
    assert_eq!(cache.event_count().await, Some(1));

    let stored = store.row(1).await.unwrap();
    assert_eq!(stored.status, OutboxStatus::Processed);
    assert!(stored.processed_at.is_some());
}

#[tokio::test]
async fn failing_row_is_isolated_and_retried() {
    init_test_tracing();

    let store = MemoryOutboxStore::new();
    let cache = FlakyCache::new(MemoryLatestCache::new());

    let healthy_a = Uuid::new_v4();
    let broken = Uuid::new_v4();
    let healthy_b = Uuid::new_v4();
    store.insert_row(row(1, 10, healthy_a, json!({"t": 1}))).await;
    store.insert_row(row(2, 11, broken, json!({"t": 2}))).await;
    store.insert_row(row(3, 12, healthy_b, json!({"t": 3}))).await;
    cache.fail_device(broken).await;

    let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let worker = OutboxPollerWorker::new(
        store.clone(),
        cache.clone(),
        poller_config(1000),
        shutdown_rx,
    );

    worker.run_iteration().await.unwrap();

    // Rows around the failing one went through.
    assert_eq!(store.row(1).await.unwrap().status, OutboxStatus::Processed);
    assert_eq!(store.row(3).await.unwrap().status, OutboxStatus::Processed);

    let failed = store.row(2).await.unwrap();
    assert_eq!(failed.status, OutboxStatus::Failed);
    assert_eq!(failed.attempts, 1);
    assert!(failed.last_error.as_deref().unwrap().contains(&broken.to_string()));

    // Once the cache recovers, the failed row is picked up again.
    cache.heal_device(&broken).await;
    worker.run_iteration().await.unwrap();

    assert_eq!(store.row(2).await.unwrap().status, OutboxStatus::Processed);
}

#[tokio::test]
async fn batch_size_bounds_each_iteration() {
    init_test_tracing();

    let store = MemoryOutboxStore::new();
    let cache = MemoryLatestCache::new();
    for id in 1..=1500 {
        store.insert_row(row(id, id, Uuid::new_v4(), json!({"n": id}))).await;
    }

    let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let worker = OutboxPollerWorker::new(
        store.clone(),
        cache.clone(),
        poller_config(1000),
        shutdown_rx,
    );

    worker.run_iteration().await.unwrap();

    let processed = store
        .rows()
        .await
        .iter()
        .filter(|row| row.status == OutboxStatus::Processed)
        .count();
    assert_eq!(processed, 1000);

    worker.run_iteration().await.unwrap();

    let processed = store
        .rows()
        .await
        .iter()
        .filter(|row| row.status == OutboxStatus::Processed)
        .count();
    assert_eq!(processed, 1500);
}

#[tokio::test]
async fn stale_rows_never_downgrade_the_cache() {
    init_test_tracing();

    let store = MemoryOutboxStore::new();
    let cache = MemoryLatestCache::new();
    let device = Uuid::new_v4();

    // Newer event sits earlier in the batch than the stale one.
    store.insert_row(row(1, 7, device, json!("C"))).await;
    store.insert_row(row(2, 3, device, json!("A"))).await;

    let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let worker = OutboxPollerWorker::new(
        store.clone(),
        cache.clone(),
        poller_config(1000),
        shutdown_rx,
    );

    worker.run_iteration().await.unwrap();

    let (version, payload) = cache.latest(&device).await.unwrap();
    assert_eq!(version, 7);
    assert_eq!(payload, json!("C"));

    // The stale row still counts as handled.
    assert_eq!(store.row(2).await.unwrap().status, OutboxStatus::Processed);
}

#[tokio::test]
async fn processed_rows_show_up_in_rendered_metrics() {
    init_test_tracing();

    // Install the recorder before driving the iteration so the counters land
    // in the rendered output.
    let handle = init_metrics_handle().unwrap();

    let store = MemoryOutboxStore::new();
    let cache = MemoryLatestCache::new();
    store.insert_row(row(1, 5, Uuid::new_v4(), json!({"t": 1}))).await;
    store.insert_row(row(2, 6, Uuid::new_v4(), json!({"t": 2}))).await;

    let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let worker = OutboxPollerWorker::new(
        store.clone(),
        cache.clone(),
        poller_config(1000),
        shutdown_rx,
    );

    worker.run_iteration().await.unwrap();

    let rendered = handle.render();
    assert!(rendered.contains("outbox_rows_processed_total"));
    assert!(rendered.contains("outbox_cache_applies_total"));
}

#[tokio::test]
async fn worker_loop_processes_rows_and_stops_on_shutdown() {
    init_test_tracing();

    let store = MemoryOutboxStore::new();
    let cache = MemoryLatestCache::new();
    let device = Uuid::new_v4();
    store.insert_row(row(1, 42, device, json!({"t": 21.5}))).await;

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let worker =
        OutboxPollerWorker::new(store.clone(), cache.clone(), poller_config(1000), shutdown_rx);
    let handle = worker.start();

    // Give the loop a few ticks to pick up the row.
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown_tx.shutdown().unwrap();
    handle.wait().await.unwrap();

    assert_eq!(store.row(1).await.unwrap().status, OutboxStatus::Processed);
    assert_eq!(cache.latest(&device).await.unwrap().0, 42);
}
