//! Shared configuration types for the outbox worker and its collaborators.

mod broker;
mod cache;
mod connection;
mod poller;
mod worker;

use thiserror::Error;

pub use broker::{BrokerAuthConfig, BrokerConfig};
pub use cache::RedisConfig;
pub use connection::{PgConnectionConfig, TlsConfig};
pub use poller::PollerConfig;
pub use worker::OutboxWorkerConfig;

/// Errors raised while validating configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field holds a value outside its accepted range.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}
