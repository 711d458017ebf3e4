//! Outbox worker service binary.
//!
//! Loads configuration, initializes telemetry, and runs the poller that
//! propagates telemetry outbox rows into the latest-value cache until a
//! shutdown signal arrives.

use crate::config::load_worker_config;
use crate::core::start_worker_with_config;
use crate::error::{WorkerError, WorkerResult};

use outbox_telemetry::metrics::init_metrics;
use outbox_telemetry::tracing::init_tracing;
use tracing::error;

mod config;
mod core;
mod error;

/// Entry point for the worker service.
///
/// Loads configuration and initializes tracing and metrics before the async
/// runtime starts, then launches the poller.
fn main() -> WorkerResult<()> {
    let config = load_worker_config()?;

    init_tracing(env!("CARGO_BIN_NAME"));
    init_metrics().map_err(WorkerError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(config))?;

    Ok(())
}

async fn async_main(config: outbox_config::shared::OutboxWorkerConfig) -> WorkerResult<()> {
    if let Err(err) = start_worker_with_config(config).await {
        error!("{err}");
        return Err(err);
    }

    Ok(())
}
