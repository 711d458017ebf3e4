//! Durable store abstraction over the outbox table.

mod base;
pub mod memory;
pub mod postgres;

pub use base::{OutboxBatch, OutboxStore};
