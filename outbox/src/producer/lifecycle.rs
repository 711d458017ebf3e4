//! Process-wide broker producer lifecycle.
//!
//! A [`TelemetryProducer`] owns at most one underlying broker producer for the
//! whole process. The producer is built lazily on first [`init`], shared by
//! every caller afterwards, and torn down exactly once by [`close`]. All
//! transitions are safe under concurrent callers: racing inits observe the
//! same instance, and publishes that race a close fail cleanly instead of
//! touching a flushed producer.
//!
//! [`init`]: TelemetryProducer::init
//! [`close`]: TelemetryProducer::close

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use outbox_config::shared::{BrokerAuthConfig, BrokerConfig};
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, OutboxResult};
use crate::metrics::{PRODUCER_MESSAGES_PUBLISHED_TOTAL, PRODUCER_PUBLISH_FAILURES_TOTAL};
use crate::producer::token::{BrokerContext, TokenProvider};
use crate::{bail, outbox_error};

/// How long a close waits for in-flight messages to drain.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Observable lifecycle state of a [`TelemetryProducer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerStatus {
    /// No producer has been built yet.
    Uninitialized,
    /// A producer is built and available for publishing.
    Ready,
    /// The producer was closed; the lifecycle is over for this process.
    Stopped,
}

impl ProducerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducerStatus::Uninitialized => "uninitialized",
            ProducerStatus::Ready => "ready",
            ProducerStatus::Stopped => "stopped",
        }
    }
}

enum LifecycleState {
    Uninitialized,
    Ready(Arc<FutureProducer<BrokerContext>>),
    Stopped,
}

/// Manager for the process-wide telemetry broker producer.
///
/// Construction is cheap and performs no I/O; the underlying client is built
/// on first [`TelemetryProducer::init`]. The underlying client connects to
/// brokers lazily, so a successful init confirms configuration validity, not
/// broker reachability.
pub struct TelemetryProducer {
    config: BrokerConfig,
    token_provider: Option<Arc<dyn TokenProvider>>,
    state: RwLock<LifecycleState>,
    // Serializes init and close so only one caller performs a transition.
    lifecycle: Mutex<()>,
}

impl TelemetryProducer {
    pub fn new(config: BrokerConfig, token_provider: Option<Arc<dyn TokenProvider>>) -> Self {
        Self {
            config,
            token_provider,
            state: RwLock::new(LifecycleState::Uninitialized),
            lifecycle: Mutex::new(()),
        }
    }

    /// Initializes the producer, building the underlying client on first call.
    ///
    /// Subsequent calls return the already-built instance. Concurrent callers
    /// all observe the same instance. Fails with [`ErrorKind::InvalidState`]
    /// once the producer has been closed.
    pub async fn init(&self) -> OutboxResult<Arc<FutureProducer<BrokerContext>>> {
        // Fast path for the common already-initialized case.
        if let LifecycleState::Ready(producer) = &*self.state.read().await {
            return Ok(producer.clone());
        }

        let _guard = self.lifecycle.lock().await;

        // Re-check: another caller may have transitioned while we waited.
        match &*self.state.read().await {
            LifecycleState::Ready(producer) => return Ok(producer.clone()),
            LifecycleState::Stopped => {
                bail!(
                    ErrorKind::InvalidState,
                    "The producer was already closed and cannot be reinitialized"
                );
            }
            LifecycleState::Uninitialized => {}
        }

        self.config.validate().map_err(|err| {
            outbox_error!(
                ErrorKind::ConfigError,
                "Invalid broker configuration",
                err.to_string()
            )
        })?;

        let producer = Arc::new(self.build_producer()?);
        *self.state.write().await = LifecycleState::Ready(producer.clone());

        info!(
            client_id = %self.config.client_id,
            "telemetry producer initialized"
        );

        Ok(producer)
    }

    /// Returns the producer if it is ready.
    pub async fn get(&self) -> OutboxResult<Arc<FutureProducer<BrokerContext>>> {
        match &*self.state.read().await {
            LifecycleState::Ready(producer) => Ok(producer.clone()),
            LifecycleState::Uninitialized => Err(outbox_error!(
                ErrorKind::ProducerNotInitialized,
                "The producer has not been initialized"
            )),
            LifecycleState::Stopped => Err(outbox_error!(
                ErrorKind::ProducerNotInitialized,
                "The producer has been closed"
            )),
        }
    }

    /// Returns the current lifecycle status.
    pub async fn status(&self) -> ProducerStatus {
        match &*self.state.read().await {
            LifecycleState::Uninitialized => ProducerStatus::Uninitialized,
            LifecycleState::Ready(_) => ProducerStatus::Ready,
            LifecycleState::Stopped => ProducerStatus::Stopped,
        }
    }

    /// Serializes `value` as JSON and publishes it to `topic`.
    ///
    /// Waits for broker acknowledgment, bounded by the configured publish
    /// timeout. Returns the partition and offset of the delivered message.
    pub async fn publish<V>(&self, topic: &str, key: &str, value: &V) -> OutboxResult<(i32, i64)>
    where
        V: Serialize,
    {
        let publish_timeout = Duration::from_millis(self.config.publish_timeout_ms);

        self.publish_with_timeout(topic, key, value, publish_timeout)
            .await
    }

    /// Like [`TelemetryProducer::publish`], with an explicit acknowledgment
    /// bound overriding the configured default.
    ///
    /// Does not retry internally; retry policy belongs to the caller.
    pub async fn publish_with_timeout<V>(
        &self,
        topic: &str,
        key: &str,
        value: &V,
        publish_timeout: Duration,
    ) -> OutboxResult<(i32, i64)>
    where
        V: Serialize,
    {
        let producer = self.get().await?;
        let payload = serde_json::to_vec(value)?;

        let record = FutureRecord::to(topic).key(key).payload(&payload);

        let delivery = tokio::time::timeout(
            publish_timeout,
            producer.send(record, Timeout::After(publish_timeout)),
        )
        .await;

        match delivery {
            Ok(Ok((partition, offset))) => {
                counter!(PRODUCER_MESSAGES_PUBLISHED_TOTAL).increment(1);
                debug!(topic, partition, offset, "published telemetry message");

                Ok((partition, offset))
            }
            Ok(Err((err, _message))) => {
                counter!(PRODUCER_PUBLISH_FAILURES_TOTAL).increment(1);

                Err(outbox_error!(
                    ErrorKind::PublishFailed,
                    "Failed to publish telemetry message",
                    err.to_string(),
                    source: err
                ))
            }
            Err(_elapsed) => {
                counter!(PRODUCER_PUBLISH_FAILURES_TOTAL).increment(1);

                Err(outbox_error!(
                    ErrorKind::PublishTimeout,
                    "Timed out waiting for broker acknowledgment",
                    detail = format!("publish timeout of {publish_timeout:?} elapsed")
                ))
            }
        }
    }

    /// Returns the number of partitions of `topic`.
    ///
    /// Probes broker metadata, so this is also a cheap reachability check.
    pub async fn partitions(&self, topic: &str) -> OutboxResult<usize> {
        let producer = self.get().await?;
        let topic = topic.to_string();
        let request_timeout = Duration::from_millis(self.config.request_timeout_ms);

        let metadata = tokio::task::spawn_blocking(move || {
            producer
                .client()
                .fetch_metadata(Some(&topic), Timeout::After(request_timeout))
        })
        .await
        .map_err(|err| {
            outbox_error!(
                ErrorKind::Unknown,
                "The metadata probe task panicked",
                err.to_string()
            )
        })?
        .map_err(|err| {
            outbox_error!(
                ErrorKind::BrokerUnreachable,
                "Failed to fetch topic metadata from the broker",
                err.to_string(),
                source: err
            )
        })?;

        let topic_metadata = metadata.topics().first().ok_or_else(|| {
            outbox_error!(
                ErrorKind::BrokerUnreachable,
                "The broker returned no metadata for the topic"
            )
        })?;

        // An unknown or errored topic still yields a metadata entry, with the
        // error attached at the topic level.
        if let Some(err) = topic_metadata.error() {
            bail!(
                ErrorKind::BrokerUnreachable,
                "The broker reported an error for the topic",
                RDKafkaErrorCode::from(err)
            );
        }

        Ok(topic_metadata.partitions().len())
    }

    /// Closes the producer, flushing in-flight messages.
    ///
    /// Idempotent: closing an uninitialized producer is a no-op that leaves
    /// the state untouched, and closing twice is a no-op the second time.
    /// After a close the producer can never be initialized again in this
    /// process.
    pub async fn close(&self) -> OutboxResult<()> {
        let _guard = self.lifecycle.lock().await;

        let producer = {
            let mut state = self.state.write().await;
            match &*state {
                // Nothing was ever built, leave the state as is.
                LifecycleState::Uninitialized => return Ok(()),
                LifecycleState::Stopped => {
                    debug!("producer already closed");
                    return Ok(());
                }
                LifecycleState::Ready(producer) => {
                    let producer = producer.clone();
                    *state = LifecycleState::Stopped;
                    producer
                }
            }
        };

        // Flushing blocks, keep it off the async runtime.
        let flushed = tokio::task::spawn_blocking(move || {
            producer.flush(Timeout::After(FLUSH_TIMEOUT))
        })
        .await;

        match flushed {
            Ok(Ok(())) => {
                info!("telemetry producer closed");
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "producer flush failed during close");
                Err(outbox_error!(
                    ErrorKind::PublishFailed,
                    "Failed to flush in-flight messages during close",
                    err.to_string(),
                    source: err
                ))
            }
            Err(err) => Err(outbox_error!(
                ErrorKind::Unknown,
                "The flush task panicked",
                err.to_string()
            )),
        }
    }

    /// Builds the underlying broker client from the configuration.
    fn build_producer(&self) -> OutboxResult<FutureProducer<BrokerContext>> {
        if matches!(self.config.auth, BrokerAuthConfig::TokenAuth) && self.token_provider.is_none()
        {
            bail!(
                ErrorKind::ConfigError,
                "Token authentication requires a token provider"
            );
        }

        let mut client_config = ClientConfig::new();
        client_config
            .set(
                "bootstrap.servers",
                self.config.bootstrap_servers.join(","),
            )
            .set("client.id", &self.config.client_id)
            // Leader acknowledgment is enough for telemetry, readers tolerate
            // the rare lost tail on broker failover.
            .set("acks", "1")
            .set("compression.type", "gzip")
            .set("request.timeout.ms", self.config.request_timeout_ms.to_string())
            .set("linger.ms", self.config.linger_ms.to_string())
            .set("message.max.bytes", self.config.max_request_size.to_string());

        if matches!(self.config.auth, BrokerAuthConfig::TokenAuth) {
            client_config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanism", "OAUTHBEARER");
        }

        let context = BrokerContext::new(self.token_provider.clone());
        let producer = client_config.create_with_context(context).map_err(|err| {
            outbox_error!(
                ErrorKind::ProducerStartFailed,
                "Failed to build the broker producer",
                err.to_string(),
                source: err
            )
        })?;

        Ok(producer)
    }
}
