//! Metrics definitions for outbox worker monitoring.

/// Label for the outcome of a cache apply, `applied` or `stale`.
pub const APPLY_OUTCOME_LABEL: &str = "outcome";

// Poller metrics

/// Counter for total poll iterations.
pub const OUTBOX_POLL_ITERATIONS_TOTAL: &str = "outbox_poll_iterations_total";

/// Counter for rows marked processed.
pub const OUTBOX_ROWS_PROCESSED_TOTAL: &str = "outbox_rows_processed_total";

/// Counter for per-row propagation failures.
pub const OUTBOX_ROWS_FAILED_TOTAL: &str = "outbox_rows_failed_total";

/// Counter for cache apply outcomes, labeled by [`APPLY_OUTCOME_LABEL`].
pub const OUTBOX_CACHE_APPLIES_TOTAL: &str = "outbox_cache_applies_total";

/// Counter for whole-iteration failures, fetch or commit level.
pub const OUTBOX_ITERATION_ERRORS_TOTAL: &str = "outbox_iteration_errors_total";

/// Gauge for the size of the last fetched batch.
pub const OUTBOX_LAST_BATCH_SIZE: &str = "outbox_last_batch_size";

// Producer metrics

/// Counter for messages published to the broker.
pub const PRODUCER_MESSAGES_PUBLISHED_TOTAL: &str = "producer_messages_published_total";

/// Counter for publish failures, timeouts included.
pub const PRODUCER_PUBLISH_FAILURES_TOTAL: &str = "producer_publish_failures_total";
