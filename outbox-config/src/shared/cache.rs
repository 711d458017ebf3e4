use serde::Deserialize;

/// Connection settings for the fast cache.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Host on which Redis is running (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,
    /// Port on which Redis is running (default: 6379).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Redis user name, when ACLs are in use.
    #[serde(default)]
    pub username: Option<String>,
    /// Redis password (optional with trust authentication).
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6379
}
