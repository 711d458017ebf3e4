//! Telemetry bootstrap for outbox services.
//!
//! Provides tracing and metrics initialization shared by binaries and tests.

pub mod metrics;
pub mod tracing;
