//! Lifecycle tests for the telemetry producer.
//!
//! The underlying broker client connects lazily, so a producer can be built
//! against unreachable bootstrap servers. These tests exercise lifecycle
//! transitions only; delivery paths need a real broker.

use std::sync::Arc;

use outbox::error::ErrorKind;
use outbox::producer::{ProducerStatus, TelemetryProducer};
use outbox_config::shared::BrokerConfig;
use outbox_telemetry::tracing::init_test_tracing;
use serde_json::json;

fn broker_config() -> BrokerConfig {
    serde_json::from_value(json!({
        "bootstrap_servers": ["localhost:19092"]
    }))
    .unwrap()
}

fn token_auth_config() -> BrokerConfig {
    serde_json::from_value(json!({
        "bootstrap_servers": ["localhost:19092"],
        "auth": {"mode": "token_auth"}
    }))
    .unwrap()
}

#[tokio::test]
async fn get_before_init_fails() {
    init_test_tracing();

    let producer = TelemetryProducer::new(broker_config(), None);

    assert_eq!(producer.status().await, ProducerStatus::Uninitialized);
    let err = producer.get().await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ProducerNotInitialized);
}

#[tokio::test]
async fn init_builds_once_and_reuses_the_instance() {
    init_test_tracing();

    let producer = TelemetryProducer::new(broker_config(), None);

    let first = producer.init().await.unwrap();
    let second = producer.init().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(producer.status().await, ProducerStatus::Ready);
}

#[tokio::test]
async fn concurrent_inits_observe_the_same_instance() {
    init_test_tracing();

    let producer = Arc::new(TelemetryProducer::new(broker_config(), None));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let producer = producer.clone();
        handles.push(tokio::spawn(async move { producer.init().await }));
    }

    let mut instances = Vec::new();
    for handle in handles {
        instances.push(handle.await.unwrap().unwrap());
    }

    let first = &instances[0];
    assert!(instances.iter().all(|instance| Arc::ptr_eq(first, instance)));
}

#[tokio::test]
async fn close_before_init_is_a_noop() {
    init_test_tracing();

    let producer = TelemetryProducer::new(broker_config(), None);

    producer.close().await.unwrap();

    // Nothing was built, so the lifecycle has not started.
    assert_eq!(producer.status().await, ProducerStatus::Uninitialized);
    producer.init().await.unwrap();
    assert_eq!(producer.status().await, ProducerStatus::Ready);
}

#[tokio::test]
async fn close_is_idempotent_and_ends_the_lifecycle() {
    init_test_tracing();

    let producer = TelemetryProducer::new(broker_config(), None);
    producer.init().await.unwrap();

    producer.close().await.unwrap();
    assert_eq!(producer.status().await, ProducerStatus::Stopped);

    // Second close is a no-op.
    producer.close().await.unwrap();

    // Publishing and reinitializing are both rejected after close.
    let err = producer.get().await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ProducerNotInitialized);

    let err = producer.init().await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn token_auth_without_provider_is_rejected() {
    init_test_tracing();

    let producer = TelemetryProducer::new(token_auth_config(), None);

    let err = producer.init().await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ConfigError);

    // A failed init leaves the lifecycle untouched.
    assert_eq!(producer.status().await, ProducerStatus::Uninitialized);
}

#[tokio::test]
async fn partitions_before_init_fails() {
    init_test_tracing();

    let producer = TelemetryProducer::new(broker_config(), None);

    // The readiness probe needs a built client; broker and topic errors are
    // only observable against a live broker.
    let err = producer.partitions("telemetry").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProducerNotInitialized);
}

#[tokio::test]
async fn publish_before_init_fails() {
    init_test_tracing();

    let producer = TelemetryProducer::new(broker_config(), None);

    let err = producer
        .publish("telemetry", "device-1", &json!({"t": 21.5}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProducerNotInitialized);
}
