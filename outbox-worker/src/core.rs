use outbox::cache::redis::RedisLatestCache;
use outbox::concurrency::shutdown::create_shutdown_channel;
use outbox::store::postgres::PostgresOutboxStore;
use outbox::worker::OutboxPollerWorker;
use outbox_config::shared::OutboxWorkerConfig;
use outbox_postgres::db::connect_pool;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use crate::error::WorkerResult;

/// Connection pool bounds for the worker.
///
/// The poller runs one transaction at a time, so a small pool is enough; the
/// extra connections cover the event count probe and keep a warm spare.
const MIN_POOL_CONNECTIONS: u32 = 1;
const MAX_POOL_CONNECTIONS: u32 = 4;

/// Starts the worker service with the provided configuration.
///
/// Connects to the durable store and the cache, launches the poller, and runs
/// until SIGINT or SIGTERM triggers a graceful shutdown.
pub async fn start_worker_with_config(config: OutboxWorkerConfig) -> WorkerResult<()> {
    info!("starting outbox worker service");

    let pool = connect_pool(
        &config.pg_connection,
        MIN_POOL_CONNECTIONS,
        MAX_POOL_CONNECTIONS,
    )
    .await
    .map_err(outbox::error::OutboxError::from)?;
    let store = PostgresOutboxStore::new(pool);

    let cache = RedisLatestCache::connect(config.cache.clone()).await?;

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let poller = OutboxPollerWorker::new(store, cache, config.poller.clone(), shutdown_rx);
    let handle = poller.start();

    // Listen for shutdown signals and propagate them to the poller. SIGTERM is
    // sent by Kubernetes before SIGKILL during pod termination.
    let signal_handle = tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                warn!(error = %err, "failed to register SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("sigint (ctrl+c) received, shutting down worker");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, shutting down worker");
            }
        }

        if let Err(err) = shutdown_tx.shutdown() {
            warn!(error = ?err, "failed to send shutdown signal");
        }
    });

    // Wait for the poller to finish, normally via shutdown.
    let result = handle.wait().await;

    // The signal task may still be waiting for a signal if the poller stopped
    // on its own; abort it before returning.
    signal_handle.abort();
    let _ = signal_handle.await;

    result?;
    info!("outbox worker service stopped");

    Ok(())
}
