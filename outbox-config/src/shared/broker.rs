use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::ValidationError;

/// Configuration for the message-broker publishing client.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Broker bootstrap endpoints, `host:port`.
    pub bootstrap_servers: Vec<String>,
    /// Client identifier reported to the broker.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Authentication mode, resolved once at startup.
    #[serde(default)]
    pub auth: BrokerAuthConfig,
    /// Upper bound, in milliseconds, for a single broker request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Batching delay before a produce request is sent.
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
    /// Maximum size of a single produce request, in bytes.
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    /// Default bound, in milliseconds, on waiting for a publish acknowledgment.
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

impl BrokerConfig {
    /// Default bound on a single broker request.
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 40_000;

    /// Default batching delay.
    pub const DEFAULT_LINGER_MS: u64 = 10;

    /// Default maximum produce request size (1 MiB).
    pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1_048_576;

    /// Default bound on waiting for a publish acknowledgment.
    pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 10_000;

    /// Validates broker configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bootstrap_servers.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "broker.bootstrap_servers".to_string(),
                constraint: "must contain at least one endpoint".to_string(),
            });
        }

        if self.max_request_size == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "broker.max_request_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Config for BrokerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["bootstrap_servers"];
}

/// Authentication mode for the broker connection.
///
/// The mode is a closed choice selected by configuration, never auto-detected.
/// Token-based authentication expects a credential source to be injected when
/// the producer is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BrokerAuthConfig {
    /// Unauthenticated plaintext transport, for local development.
    #[default]
    Plaintext,
    /// Token-based authentication over a secured transport; the token is
    /// minted per connection by an external credential-signing call.
    TokenAuth,
}

fn default_client_id() -> String {
    "telemetry-producer".to_string()
}

fn default_request_timeout_ms() -> u64 {
    BrokerConfig::DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_linger_ms() -> u64 {
    BrokerConfig::DEFAULT_LINGER_MS
}

fn default_max_request_size() -> usize {
    BrokerConfig::DEFAULT_MAX_REQUEST_SIZE
}

fn default_publish_timeout_ms() -> u64 {
    BrokerConfig::DEFAULT_PUBLISH_TIMEOUT_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BrokerConfig {
        BrokerConfig {
            bootstrap_servers: vec!["localhost:9092".to_string()],
            client_id: default_client_id(),
            auth: BrokerAuthConfig::Plaintext,
            request_timeout_ms: default_request_timeout_ms(),
            linger_ms: default_linger_ms(),
            max_request_size: default_max_request_size(),
            publish_timeout_ms: default_publish_timeout_ms(),
        }
    }

    #[test]
    fn defaults_match_broker_contract() {
        let config = config();
        assert_eq!(config.request_timeout_ms, 40_000);
        assert_eq!(config.linger_ms, 10);
        assert_eq!(config.max_request_size, 1_048_576);
        assert_eq!(config.publish_timeout_ms, 10_000);
    }

    #[test]
    fn rejects_empty_bootstrap_servers() {
        let mut config = config();
        config.bootstrap_servers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn auth_mode_deserializes_from_tag() {
        let auth: BrokerAuthConfig = serde_json::from_str(r#"{"mode":"token_auth"}"#).unwrap();
        assert_eq!(auth, BrokerAuthConfig::TokenAuth);
    }
}
