//! Structured logging initialization.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes structured logging for a service binary.
///
/// Log levels are configurable through the `RUST_LOG` environment variable,
/// falling back to `info` for the given service when unset.
pub fn init_tracing(service_name: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{service_name}=info,outbox=info").into()),
        )
        .with(fmt::layer())
        .init();
}

/// Initializes tracing for tests, at most once per process.
///
/// Safe to call from every test; only the first call installs the subscriber.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}
