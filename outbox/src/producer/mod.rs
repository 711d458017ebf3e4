//! Telemetry broker producer lifecycle management.

pub mod lifecycle;
mod token;

pub use lifecycle::{ProducerStatus, TelemetryProducer};
pub use token::{BrokerContext, BrokerToken, TokenProvider};
