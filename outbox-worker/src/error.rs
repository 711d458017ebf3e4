use std::error::Error;

use outbox::error::OutboxError;
use thiserror::Error;

/// Result type for worker service operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Error type for the outbox worker service.
///
/// Wraps [`OutboxError`] for engine errors and provides variants for
/// infrastructure failures around it.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Engine-level error from the outbox crate.
    #[error(transparent)]
    Outbox(#[from] OutboxError),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(Box<dyn Error + Send + Sync>),

    /// I/O error, runtime construction included.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Creates a configuration error from any boxed source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        WorkerError::Config(Box::new(err))
    }
}
