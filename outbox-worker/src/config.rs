use outbox_config::load_config;
use outbox_config::shared::OutboxWorkerConfig;

use crate::error::{WorkerError, WorkerResult};

/// Loads and validates the worker configuration.
///
/// Uses the layered configuration loader from [`outbox_config`] and validates
/// the resulting [`OutboxWorkerConfig`] before returning it.
pub fn load_worker_config() -> WorkerResult<OutboxWorkerConfig> {
    let config = load_config::<OutboxWorkerConfig>().map_err(WorkerError::config)?;
    config.validate().map_err(WorkerError::config)?;

    Ok(config)
}
