use serde::Deserialize;

use crate::Config;
use crate::shared::{PgConnectionConfig, PollerConfig, RedisConfig, ValidationError};

/// Top-level configuration for the outbox worker service.
#[derive(Debug, Clone, Deserialize)]
pub struct OutboxWorkerConfig {
    /// Connection to the durable store holding the outbox table.
    pub pg_connection: PgConnectionConfig,
    /// Connection to the fast cache receiving latest values.
    #[serde(default)]
    pub cache: RedisConfig,
    /// Poll loop settings.
    #[serde(default)]
    pub poller: PollerConfig,
}

impl OutboxWorkerConfig {
    /// Validates all nested configuration sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.poller.validate()
    }
}

impl Config for OutboxWorkerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
