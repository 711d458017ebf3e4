//! Redis-backed latest-value cache.
//!
//! Implements the conditional apply with a server-side Lua script so the
//! version comparison and the write happen atomically inside Redis. The script
//! is loaded lazily and reloaded transparently when the server loses it, for
//! example after a restart or a failover to a replica without the script.

use std::sync::Arc;
use std::time::Duration;

use fred::prelude::{
    ClientLike, EventInterface, KeysInterface, LuaInterface, Pool, ReconnectPolicy, Server,
    ServerConfig, TcpConfig,
};
use fred::types::Builder;
use fred::types::config::UnresponsiveConfig;
use futures::future::join_all;
use outbox_config::shared::RedisConfig;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::cache::base::{ApplyOutcome, LatestCache, TELEMETRY_COUNT_KEY, latest_keys};
use crate::error::{ErrorKind, OutboxResult};
use crate::outbox_error;

/// Compares the incoming version against the stored version key and writes
/// payload and version only when strictly newer.
///
/// KEYS[1] = data key, KEYS[2] = version key.
/// ARGV[1] = incoming version, ARGV[2] = serialized payload.
const SET_IF_NEWER_LUA: &str = r#"
local current = redis.call('GET', KEYS[2])
if current == false or tonumber(ARGV[1]) > tonumber(current) then
  redis.call('SET', KEYS[1], ARGV[2])
  redis.call('SET', KEYS[2], ARGV[1])
  return 1
end
return 0
"#;

const POOL_SIZE: usize = 5;

/// [`LatestCache`] implementation backed by a Redis connection pool.
#[derive(Debug, Clone)]
pub struct RedisLatestCache {
    pool: Pool,
    script_sha: Arc<Mutex<Option<String>>>,
}

impl RedisLatestCache {
    /// Connects to Redis and returns a ready cache.
    ///
    /// Connection errors and unresponsive servers are logged from background
    /// tasks; the pool reconnects with exponential backoff.
    pub async fn connect(config: RedisConfig) -> OutboxResult<Self> {
        let pool = Builder::default_centralized()
            .with_config(|redis_config| {
                redis_config.password = config.password.clone();
                redis_config.username = config.username.clone();
                redis_config.server = ServerConfig::Centralized {
                    server: Server::new(config.host.clone(), config.port),
                };
            })
            .with_connection_config(|config| {
                config.internal_command_timeout = Duration::from_secs(5);
                config.reconnect_on_auth_error = true;
                config.tcp = TcpConfig {
                    #[cfg(target_os = "linux")]
                    user_timeout: Some(Duration::from_secs(5)),
                    ..Default::default()
                };
                config.unresponsive = UnresponsiveConfig {
                    max_timeout: Some(Duration::from_secs(10)),
                    interval: Duration::from_secs(3),
                };
            })
            .with_performance_config(|config| {
                config.default_command_timeout = Duration::from_secs(5);
            })
            .set_policy(ReconnectPolicy::new_exponential(0, 1, 2000, 5))
            .build_pool(POOL_SIZE)
            .map_err(|err| {
                outbox_error!(
                    ErrorKind::CacheConnectionFailed,
                    "Failed to build cache connection pool",
                    err.to_string()
                )
            })?;

        for client in pool.clients() {
            let mut error_rx = client.error_rx();
            let mut unresponsive_rx = client.unresponsive_rx();

            tokio::spawn(async move {
                loop {
                    match error_rx.recv().await {
                        Ok((error, Some(server))) => {
                            error!("cache client ({server:?}) error: {error:?}");
                        }
                        Ok((error, None)) => {
                            error!("cache client error: {error:?}");
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            tokio::spawn(async move {
                loop {
                    match unresponsive_rx.recv().await {
                        Ok(server) => {
                            warn!("cache client ({server:?}) unresponsive");
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            });
        }

        let connect_handles = pool.connect_pool();
        pool.wait_for_connect().await.map_err(|err| {
            outbox_error!(
                ErrorKind::CacheConnectionFailed,
                "Failed to connect to the cache",
                err.to_string()
            )
        })?;

        tokio::spawn(async move {
            let _results = join_all(connect_handles).await;
        });

        debug!("connected to cache");

        Ok(Self {
            pool,
            script_sha: Arc::new(Mutex::new(None)),
        })
    }

    /// Returns the sha of the apply script, loading it on first use.
    async fn script_sha(&self) -> OutboxResult<String> {
        let mut sha = self.script_sha.lock().await;
        if let Some(sha) = sha.as_ref() {
            return Ok(sha.clone());
        }

        let loaded = self.load_script().await?;
        *sha = Some(loaded.clone());

        Ok(loaded)
    }

    async fn load_script(&self) -> OutboxResult<String> {
        let sha: String = self.pool.script_load(SET_IF_NEWER_LUA).await.map_err(|err| {
            outbox_error!(
                ErrorKind::CacheScriptFailed,
                "Failed to load the conditional apply script",
                err.to_string()
            )
        })?;

        debug!(sha = %sha, "loaded conditional apply script");

        Ok(sha)
    }

    async fn evalsha_apply(
        &self,
        sha: &str,
        data_key: &str,
        version_key: &str,
        version: i64,
        payload: &str,
    ) -> Result<i64, fred::error::Error> {
        self.pool
            .evalsha::<i64, _, _, _>(
                sha,
                vec![data_key.to_string(), version_key.to_string()],
                vec![version.to_string(), payload.to_string()],
            )
            .await
    }
}

impl LatestCache for RedisLatestCache {
    async fn apply_if_newer(
        &self,
        device_uuid: &Uuid,
        version: i64,
        payload: &serde_json::Value,
    ) -> OutboxResult<ApplyOutcome> {
        let (data_key, version_key) = latest_keys(device_uuid);
        let serialized = serde_json::to_string(payload)?;

        let sha = self.script_sha().await?;
        let result = match self
            .evalsha_apply(&sha, &data_key, &version_key, version, &serialized)
            .await
        {
            Ok(result) => result,
            // The server lost the script, reload and retry once.
            Err(err) if err.details().contains("NOSCRIPT") => {
                warn!("conditional apply script missing on server, reloading");

                let reloaded = self.load_script().await?;
                *self.script_sha.lock().await = Some(reloaded.clone());

                self.evalsha_apply(&reloaded, &data_key, &version_key, version, &serialized)
                    .await?
            }
            Err(err) => return Err(err.into()),
        };

        Ok(if result == 1 {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::Stale
        })
    }

    async fn set_event_count(&self, count: i64) -> OutboxResult<()> {
        self.pool
            .set::<(), _, _>(TELEMETRY_COUNT_KEY, count, None, None, false)
            .await?;

        Ok(())
    }
}
