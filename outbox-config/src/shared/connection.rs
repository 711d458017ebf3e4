use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Application name reported to Postgres by the outbox worker's connections.
const APP_NAME_OUTBOX_WORKER: &str = "telemetry_outbox_worker";

/// Connection settings for the durable store.
#[derive(Debug, Clone, Deserialize)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Database name.
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
    pub tls: TlsConfig,
}

impl PgConnectionConfig {
    /// Builds sqlx connect options without selecting a database.
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.tls.enabled {
            PgSslMode::VerifyFull
        } else {
            PgSslMode::Prefer
        };

        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .application_name(APP_NAME_OUTBOX_WORKER)
            .ssl_mode(ssl_mode)
            .ssl_root_cert_from_pem(self.tls.trusted_root_certs.clone().into_bytes());

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }

    /// Builds sqlx connect options targeting the configured database.
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.name)
    }
}

/// TLS settings for the Postgres connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM-encoded trusted root certificates.
    pub trusted_root_certs: String,
    pub enabled: bool,
}

impl TlsConfig {
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: "".to_string(),
            enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PgConnectionConfig {
        PgConnectionConfig {
            host: "localhost".to_string(),
            port: 5432,
            name: "telemetry".to_string(),
            username: "postgres".to_string(),
            password: None,
            tls: TlsConfig::disabled(),
        }
    }

    #[test]
    fn with_db_selects_database() {
        let options = config().with_db();
        assert_eq!(options.get_database(), Some("telemetry"));
    }

    #[test]
    fn disabled_tls_prefers_plain() {
        let options = config().without_db();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
    }
}
