//! In-memory latest-value cache for testing and development purposes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::base::{ApplyOutcome, LatestCache};
use crate::error::OutboxResult;

#[derive(Debug, Default)]
struct Inner {
    latest: HashMap<Uuid, (i64, serde_json::Value)>,
    event_count: Option<i64>,
}

/// [`LatestCache`] implementation that stores everything in memory.
///
/// Applies the same strictly-greater version rule as the Redis cache, which
/// makes it a drop-in stand-in for poller tests. All data is lost when the
/// process terminates.
#[derive(Debug, Clone, Default)]
pub struct MemoryLatestCache {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLatestCache {
    /// Creates a new empty memory cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached `(version, payload)` pair for a device, if any.
    pub async fn latest(&self, device_uuid: &Uuid) -> Option<(i64, serde_json::Value)> {
        let inner = self.inner.lock().await;
        inner.latest.get(device_uuid).cloned()
    }

    /// Returns the last written event count, if any.
    pub async fn event_count(&self) -> Option<i64> {
        let inner = self.inner.lock().await;
        inner.event_count
    }

    /// Clears all cached values.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.latest.clear();
        inner.event_count = None;
    }
}

impl LatestCache for MemoryLatestCache {
    async fn apply_if_newer(
        &self,
        device_uuid: &Uuid,
        version: i64,
        payload: &serde_json::Value,
    ) -> OutboxResult<ApplyOutcome> {
        let mut inner = self.inner.lock().await;

        match inner.latest.get(device_uuid) {
            Some((current, _)) if *current >= version => Ok(ApplyOutcome::Stale),
            _ => {
                inner.latest.insert(*device_uuid, (version, payload.clone()));
                Ok(ApplyOutcome::Applied)
            }
        }
    }

    async fn set_event_count(&self, count: i64) -> OutboxResult<()> {
        let mut inner = self.inner.lock().await;
        inner.event_count = Some(count);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn newer_version_replaces_older() {
        let cache = MemoryLatestCache::new();
        let device = Uuid::new_v4();

        let outcome = cache
            .apply_if_newer(&device, 5, &serde_json::json!("B"))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let outcome = cache
            .apply_if_newer(&device, 7, &serde_json::json!("C"))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let (version, payload) = cache.latest(&device).await.unwrap();
        assert_eq!(version, 7);
        assert_eq!(payload, serde_json::json!("C"));
    }

    #[tokio::test]
    async fn older_version_never_overwrites() {
        let cache = MemoryLatestCache::new();
        let device = Uuid::new_v4();

        cache
            .apply_if_newer(&device, 5, &serde_json::json!("B"))
            .await
            .unwrap();

        let outcome = cache
            .apply_if_newer(&device, 3, &serde_json::json!("A"))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Stale);

        let (version, payload) = cache.latest(&device).await.unwrap();
        assert_eq!(version, 5);
        assert_eq!(payload, serde_json::json!("B"));
    }

    #[tokio::test]
    async fn replaying_same_version_is_idempotent() {
        let cache = MemoryLatestCache::new();
        let device = Uuid::new_v4();

        cache
            .apply_if_newer(&device, 5, &serde_json::json!("B"))
            .await
            .unwrap();

        let outcome = cache
            .apply_if_newer(&device, 5, &serde_json::json!("B2"))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Stale);

        let (_, payload) = cache.latest(&device).await.unwrap();
        assert_eq!(payload, serde_json::json!("B"));
    }
}
