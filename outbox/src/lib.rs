//! Core engine for propagating telemetry outbox rows into a latest-value cache.
//!
//! The engine polls a Postgres outbox table for unprocessed rows, applies each
//! row to a cache under a monotonic-freshness rule, and marks applied rows
//! processed. Rows that fail are isolated and retried on later iterations. The
//! crate also manages the lifecycle of a process-wide telemetry broker
//! producer.

pub mod cache;
pub mod concurrency;
pub mod error;
pub mod macros;
pub mod metrics;
pub mod producer;
pub mod store;
pub mod worker;
