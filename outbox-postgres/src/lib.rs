//! Postgres access for the telemetry outbox.
//!
//! Holds the row models and queries for the `telemetry_latest_outbox` work
//! queue and the telemetry event count, plus pool construction. Schema
//! migrations are managed outside this crate.

pub mod db;
pub mod outbox;
