use serde::Deserialize;

use crate::shared::ValidationError;

/// Settings for the outbox poll loop.
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Maximum number of outbox rows fetched per iteration.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Fixed delay between poll iterations, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl PollerConfig {
    /// Default upper bound on rows fetched per iteration.
    pub const DEFAULT_BATCH_SIZE: i64 = 1000;

    /// Default poll interval.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

    /// Validates poller configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size <= 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "poller.batch_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "poller.poll_interval_ms".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_batch_size() -> i64 {
    PollerConfig::DEFAULT_BATCH_SIZE
}

fn default_poll_interval_ms() -> u64 {
    PollerConfig::DEFAULT_POLL_INTERVAL_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bound_the_batch() {
        let config = PollerConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let config = PollerConfig {
            batch_size: 0,
            ..PollerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
