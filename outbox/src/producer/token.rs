//! Broker authentication via short-lived tokens.
//!
//! When token authentication is enabled, the broker client periodically asks
//! for a fresh token through the OAUTHBEARER refresh callback. The callback
//! runs on a client-internal thread, so providers must be synchronous and
//! thread-safe.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use rdkafka::client::{ClientContext, OAuthToken};

/// A token handed to the broker client for authentication.
#[derive(Debug, Clone)]
pub struct BrokerToken {
    /// Opaque token value presented to the broker.
    pub token: String,
    /// Principal name the token authenticates as.
    pub principal: String,
    /// Remaining token lifetime in milliseconds; the client refreshes before
    /// expiry.
    pub lifetime_ms: i64,
}

/// Trait for sources of broker authentication tokens.
///
/// Implementations typically exchange cloud credentials for a short-lived
/// token. Called from a non-async client thread, so blocking here is fine but
/// must be bounded.
pub trait TokenProvider: Send + Sync + fmt::Debug {
    /// Fetches a fresh token.
    fn fetch_token(&self) -> Result<BrokerToken, Box<dyn Error + Send + Sync>>;
}

/// Client context wiring an optional [`TokenProvider`] into the broker client.
#[derive(Debug, Clone)]
pub struct BrokerContext {
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl BrokerContext {
    pub fn new(token_provider: Option<Arc<dyn TokenProvider>>) -> Self {
        Self { token_provider }
    }
}

impl ClientContext for BrokerContext {
    // The refresh callback only fires when the connection actually uses
    // OAUTHBEARER, so enabling it unconditionally is safe.
    const ENABLE_REFRESH_OAUTH_TOKEN: bool = true;

    fn generate_oauth_token(
        &self,
        _oauthbearer_config: Option<&str>,
    ) -> Result<OAuthToken, Box<dyn Error>> {
        let provider = self
            .token_provider
            .as_ref()
            .ok_or("no token provider configured for token authentication")?;

        let token = provider
            .fetch_token()
            .map_err(|err| -> Box<dyn Error> { err })?;

        Ok(OAuthToken {
            token: token.token,
            principal_name: token.principal,
            lifetime_ms: token.lifetime_ms,
        })
    }
}
