use std::future::Future;

use uuid::Uuid;

use crate::error::OutboxResult;

/// Key prefix under which per-device latest values are stored.
pub const TELEMETRY_LATEST_PREFIX: &str = "telemetry:latest";

/// Key holding the total telemetry event count.
pub const TELEMETRY_COUNT_KEY: &str = "telemetry:count";

/// Returns the `(data, version)` key pair for a device.
///
/// The version key shadows the data key with a `:ver` suffix and holds the
/// event id of the value currently cached.
pub fn latest_keys(device_uuid: &Uuid) -> (String, String) {
    let data_key = format!("{TELEMETRY_LATEST_PREFIX}:{device_uuid}");
    let version_key = format!("{data_key}:ver");

    (data_key, version_key)
}

/// Outcome of a conditional cache apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The incoming value was newer and was written.
    Applied,
    /// The cache already held an equal or newer version, nothing was written.
    Stale,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::Stale => "stale",
        }
    }
}

/// Trait for caches that hold the latest telemetry value per device.
///
/// Implementations must uphold monotonic freshness: once a version is visible
/// for a device, no older version may ever replace it, regardless of the order
/// in which writes arrive. The comparison and write must be atomic with
/// respect to concurrent writers of the same device.
pub trait LatestCache {
    /// Writes `payload` as the latest value for the device if `version` is
    /// strictly greater than the version currently cached.
    ///
    /// An absent version counts as older than any incoming one. Replaying the
    /// same version is a no-op reported as [`ApplyOutcome::Stale`].
    fn apply_if_newer(
        &self,
        device_uuid: &Uuid,
        version: i64,
        payload: &serde_json::Value,
    ) -> impl Future<Output = OutboxResult<ApplyOutcome>> + Send;

    /// Overwrites the total telemetry event count.
    ///
    /// The count is informational and carries no freshness guarantee.
    fn set_event_count(&self, count: i64) -> impl Future<Output = OutboxResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_keys_shadow_with_ver_suffix() {
        let device = Uuid::nil();
        let (data_key, version_key) = latest_keys(&device);

        assert_eq!(
            data_key,
            "telemetry:latest:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(version_key, format!("{data_key}:ver"));
    }
}
