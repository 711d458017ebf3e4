//! Configuration loading and shared configuration types for the outbox
//! synchronization engine.
//!
//! Configuration is loaded hierarchically from a `configuration/` directory
//! (a base file plus an environment-specific file) with `APP_`-prefixed
//! environment variable overrides applied on top.

mod load;
pub mod shared;

pub use load::{Config, Environment, LoadConfigError, load_config};
