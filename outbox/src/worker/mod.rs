//! Background workers.

pub mod poller;

pub use poller::{OutboxPollerHandle, OutboxPollerWorker};
