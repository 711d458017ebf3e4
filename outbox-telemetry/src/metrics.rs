//! Metrics recorder initialization.

use std::sync::Mutex;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::trace;

// Global cache for the Prometheus handle used by [`init_metrics_handle`].
//
// A [`Mutex`] is used instead of [`Once`] or [`OnceLock`] because the
// initialization code is fallible. [`PrometheusBuilder::install_recorder`]
// installs a global recorder and any later call fails, and tests initialize
// metrics repeatedly, so the handle must be cached.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Initializes metrics and returns a handle for rendering.
///
/// Installation happens only once; subsequent calls return cloned handles
/// from the cache. A background task runs periodic upkeep to keep recorder
/// memory bounded.
pub fn init_metrics_handle() -> Result<PrometheusHandle, BuildError> {
    let mut prometheus_handle = PROMETHEUS_HANDLE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = &*prometheus_handle {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    *prometheus_handle = Some(handle.clone());

    let handle_clone = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trace!("running metrics upkeep");
            handle_clone.run_upkeep();
        }
    });

    Ok(handle)
}

/// Initializes metrics with an HTTP listener for Prometheus scraping.
///
/// Installs the global recorder and serves `/metrics` on `[::]:9000`.
pub fn init_metrics() -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(std::net::SocketAddr::new(
            std::net::IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
            9000,
        ))
        .install()?;

    Ok(())
}
