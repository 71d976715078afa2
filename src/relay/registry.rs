use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::models::DeviceRecord;
use crate::config::ReregisterPolicy;
use crate::error::{RelayError, Result};

/// Registry entry: descriptor plus the handle of the poller that owns it
#[derive(Debug)]
struct DeviceEntry {
    record: DeviceRecord,
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct RegistryInner {
    devices: HashMap<String, DeviceEntry>,
    next_generation: u64,
}

/// Handed to the poller started for a registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub generation: u64,
    pub cancel: CancellationToken,
    /// An earlier registration with the same id was cancelled
    pub replaced: bool,
}

/// Outcome of recording a fetched status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Changed,
    Unchanged,
    /// The device was removed or re-registered; the caller must stop
    Gone,
}

/// In-memory device registry.
///
/// Cheap to clone; all clones share the same map. Every registration gets a
/// fresh generation number and a child of the registry's root cancellation
/// token, so a poller can tell whether the entry it was started for still
/// exists.
#[derive(Clone, Debug, Default)]
pub struct DeviceRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    root: CancellationToken,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device with its status unset.
    pub async fn register(
        &self,
        mut record: DeviceRecord,
        policy: ReregisterPolicy,
    ) -> Result<Registration> {
        record.status = None;
        let mut inner = self.inner.write().await;

        let replaced = match inner.devices.get(&record.id) {
            Some(_) if policy == ReregisterPolicy::Reject => {
                return Err(RelayError::DeviceConflict(record.id));
            },
            Some(existing) => {
                existing.cancel.cancel();
                true
            },
            None => false,
        };

        inner.next_generation += 1;
        let registration = Registration {
            generation: inner.next_generation,
            cancel: self.root.child_token(),
            replaced,
        };

        inner.devices.insert(
            record.id.clone(),
            DeviceEntry {
                record,
                generation: registration.generation,
                cancel: registration.cancel.clone(),
            },
        );

        Ok(registration)
    }

    /// Snapshot of all devices, ordered by id
    pub async fn list(&self) -> Vec<DeviceRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<DeviceRecord> =
            inner.devices.values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    #[cfg(test)]
    pub(crate) async fn get(&self, id: &str) -> Option<DeviceRecord> {
        self.inner
            .read()
            .await
            .devices
            .get(id)
            .map(|e| e.record.clone())
    }

    /// Delete a device and cancel its poller. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        match self.inner.write().await.devices.remove(id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            },
            None => false,
        }
    }

    /// True while `id` is still registered under `generation`
    pub async fn contains(&self, id: &str, generation: u64) -> bool {
        self.inner
            .read()
            .await
            .devices
            .get(id)
            .is_some_and(|e| e.generation == generation)
    }

    /// Compare `status` with the stored value and store it if different.
    /// An unset status compares equal to JSON `null`.
    ///
    /// Comparison and write happen under one write lock, so a broadcast
    /// that follows a `Changed` result never races a stale read.
    pub async fn record_status(&self, id: &str, generation: u64, status: Value) -> StatusUpdate {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.devices.get_mut(id) else {
            return StatusUpdate::Gone;
        };
        if entry.generation != generation {
            return StatusUpdate::Gone;
        }

        if entry.record.status.as_ref().unwrap_or(&Value::Null) == &status {
            StatusUpdate::Unchanged
        } else {
            entry.record.status = Some(status);
            StatusUpdate::Changed
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.devices.len()
    }

    /// Cancel every poller without touching the map
    pub fn cancel_all(&self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(id: &str) -> DeviceRecord {
        DeviceRecord {
            id: id.to_string(),
            device_type: "shelly".to_string(),
            ip: "127.0.0.1".to_string(),
            port: 8086,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let registry = DeviceRegistry::new();
        registry
            .register(device("d1"), ReregisterPolicy::Replace)
            .await
            .unwrap();

        let devices = registry.list().await;
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "d1");
        assert!(devices[0].status.is_none());
    }

    #[tokio::test]
    async fn test_register_clears_supplied_status() {
        let registry = DeviceRegistry::new();
        let mut record = device("d1");
        record.status = Some(json!({"on": true}));

        registry
            .register(record, ReregisterPolicy::Replace)
            .await
            .unwrap();
        assert!(registry.get("d1").await.unwrap().status.is_none());
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let registry = DeviceRegistry::new();
        for id in ["c", "a", "b"] {
            registry
                .register(device(id), ReregisterPolicy::Replace)
                .await
                .unwrap();
        }
        let ids: Vec<String> = registry.list().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_remove_cancels_token() {
        let registry = DeviceRegistry::new();
        let registration = registry
            .register(device("d1"), ReregisterPolicy::Replace)
            .await
            .unwrap();

        assert!(registry.remove("d1").await);
        assert!(registration.cancel.is_cancelled());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let registry = DeviceRegistry::new();
        assert!(!registry.remove("ghost").await);
    }

    #[tokio::test]
    async fn test_replace_cancels_previous_registration() {
        let registry = DeviceRegistry::new();
        let first = registry
            .register(device("d1"), ReregisterPolicy::Replace)
            .await
            .unwrap();
        let second = registry
            .register(device("d1"), ReregisterPolicy::Replace)
            .await
            .unwrap();

        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert!(second.replaced);
        assert!(!registry.contains("d1", first.generation).await);
        assert!(registry.contains("d1", second.generation).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reject_policy_conflicts() {
        let registry = DeviceRegistry::new();
        registry
            .register(device("d1"), ReregisterPolicy::Reject)
            .await
            .unwrap();

        let err = registry
            .register(device("d1"), ReregisterPolicy::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::DeviceConflict(id) if id == "d1"));
    }

    #[tokio::test]
    async fn test_record_status_detects_changes() {
        let registry = DeviceRegistry::new();
        let reg = registry
            .register(device("d1"), ReregisterPolicy::Replace)
            .await
            .unwrap();

        let on = json!({"on": true});
        assert_eq!(
            registry.record_status("d1", reg.generation, on.clone()).await,
            StatusUpdate::Changed
        );
        assert_eq!(
            registry.record_status("d1", reg.generation, on.clone()).await,
            StatusUpdate::Unchanged
        );
        assert_eq!(
            registry
                .record_status("d1", reg.generation, json!({"on": false}))
                .await,
            StatusUpdate::Changed
        );
        assert_eq!(
            registry.get("d1").await.unwrap().status,
            Some(json!({"on": false}))
        );
    }

    #[tokio::test]
    async fn test_null_status_matches_unset() {
        let registry = DeviceRegistry::new();
        let reg = registry
            .register(device("d1"), ReregisterPolicy::Replace)
            .await
            .unwrap();

        assert_eq!(
            registry.record_status("d1", reg.generation, Value::Null).await,
            StatusUpdate::Unchanged
        );
        assert!(registry.get("d1").await.unwrap().status.is_none());

        registry
            .record_status("d1", reg.generation, json!({"on": true}))
            .await;
        assert_eq!(
            registry.record_status("d1", reg.generation, Value::Null).await,
            StatusUpdate::Changed
        );
        assert_eq!(
            registry.get("d1").await.unwrap().status,
            Some(Value::Null)
        );
    }

    #[tokio::test]
    async fn test_record_status_for_stale_generation() {
        let registry = DeviceRegistry::new();
        let old = registry
            .register(device("d1"), ReregisterPolicy::Replace)
            .await
            .unwrap();
        registry
            .register(device("d1"), ReregisterPolicy::Replace)
            .await
            .unwrap();

        assert_eq!(
            registry
                .record_status("d1", old.generation, json!({"on": true}))
                .await,
            StatusUpdate::Gone
        );
        assert!(registry.get("d1").await.unwrap().status.is_none());
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let registry = DeviceRegistry::new();
        let a = registry
            .register(device("a"), ReregisterPolicy::Replace)
            .await
            .unwrap();
        let b = registry
            .register(device("b"), ReregisterPolicy::Replace)
            .await
            .unwrap();

        registry.cancel_all();
        assert!(a.cancel.is_cancelled());
        assert!(b.cancel.is_cancelled());
    }
}
