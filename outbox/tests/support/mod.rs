//! Shared helpers for integration tests.

use std::collections::HashSet;
use std::sync::Arc;

use outbox::cache::memory::MemoryLatestCache;
use outbox::cache::{ApplyOutcome, LatestCache};
use outbox::error::{ErrorKind, OutboxResult};
use outbox::outbox_error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Cache wrapper that fails applies for selected devices.
///
/// Lets tests verify that one broken row neither blocks the rows around it
/// nor escapes the per-row failure handling.
#[derive(Debug, Clone)]
pub struct FlakyCache {
    inner: MemoryLatestCache,
    failing_devices: Arc<Mutex<HashSet<Uuid>>>,
}

impl FlakyCache {
    pub fn new(inner: MemoryLatestCache) -> Self {
        Self {
            inner,
            failing_devices: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn fail_device(&self, device_uuid: Uuid) {
        self.failing_devices.lock().await.insert(device_uuid);
    }

    pub async fn heal_device(&self, device_uuid: &Uuid) {
        self.failing_devices.lock().await.remove(device_uuid);
    }
}

impl LatestCache for FlakyCache {
    async fn apply_if_newer(
        &self,
        device_uuid: &Uuid,
        version: i64,
        payload: &serde_json::Value,
    ) -> OutboxResult<ApplyOutcome> {
        if self.failing_devices.lock().await.contains(device_uuid) {
            return Err(outbox_error!(
                ErrorKind::CacheOperationFailed,
                "A cache operation failed",
                format!("injected failure for device {device_uuid}")
            ));
        }

        self.inner.apply_if_newer(device_uuid, version, payload).await
    }

    async fn set_event_count(&self, count: i64) -> OutboxResult<()> {
        self.inner.set_event_count(count).await
    }
}
