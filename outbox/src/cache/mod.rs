//! Latest-value cache abstraction and implementations.

mod base;
pub mod memory;
pub mod redis;

pub use base::{
    ApplyOutcome, LatestCache, TELEMETRY_COUNT_KEY, TELEMETRY_LATEST_PREFIX, latest_keys,
};
