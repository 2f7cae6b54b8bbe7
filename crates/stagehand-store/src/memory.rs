//! In-memory implementation of the SnapshotStore trait.
//!
//! Used by tests and by hosts that already keep their state in memory. One
//! `watch` channel per resource type holds the latest snapshot.

use std::collections::HashMap;

use serde_json::Value;
use stagehand_core::{ResourceKind, Snapshot};
use tokio::sync::watch;

use crate::error::{Result, StoreError};
use crate::traits::{PublishResult, SnapshotStore, Subscription};

/// In-memory snapshot store.
pub struct MemoryStore {
    channels: HashMap<ResourceKind, watch::Sender<Option<Snapshot>>>,
}

impl MemoryStore {
    /// Create a store with no snapshots for any resource type.
    pub fn new() -> Self {
        let channels = ResourceKind::ALL
            .iter()
            .map(|kind| (*kind, watch::channel(None).0))
            .collect();
        Self { channels }
    }

    /// Create a store pre-populated with one snapshot per given kind.
    pub fn with_snapshots(snapshots: impl IntoIterator<Item = (ResourceKind, Value)>) -> Self {
        let store = Self::new();
        for (kind, value) in snapshots {
            store.publish(kind, value);
        }
        store
    }

    /// Publish a new snapshot of `kind`.
    ///
    /// Values equal to the current one are not re-announced.
    pub fn publish(&self, kind: ResourceKind, value: impl Into<Snapshot>) -> PublishResult {
        let Some(sender) = self.channels.get(&kind) else {
            return PublishResult::Unchanged;
        };
        let snapshot = value.into();

        let changed = sender.send_if_modified(|current| {
            if current.as_ref() == Some(&snapshot) {
                false
            } else {
                *current = Some(snapshot.clone());
                true
            }
        });

        if changed {
            tracing::trace!(kind = %kind, fingerprint = %snapshot.fingerprint(), "snapshot published");
            PublishResult::Published
        } else {
            PublishResult::Unchanged
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemoryStore {
    fn subscribe(&self, kind: ResourceKind) -> Result<Subscription> {
        let sender = self
            .channels
            .get(&kind)
            .ok_or(StoreError::Unavailable(kind))?;
        Ok(Subscription::new(kind, sender.subscribe()))
    }

    fn current(&self, kind: ResourceKind) -> Option<Snapshot> {
        self.channels
            .get(&kind)
            .and_then(|sender| sender.borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_subscriber_sees_current_value_immediately() {
        let store = MemoryStore::with_snapshots([(ResourceKind::Groups, json!([{ "groupID": "default" }]))]);

        let mut sub = store.subscribe(ResourceKind::Groups).unwrap();
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.value(), &json!([{ "groupID": "default" }]));
    }

    #[tokio::test]
    async fn test_subscriber_waits_for_first_value() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(ResourceKind::Participant).unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(20), sub.next()).await;
        assert!(pending.is_err(), "no snapshot published yet");

        store.publish(ResourceKind::Participant, json!({ "sessionID": "s-1" }));
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.value()["sessionID"], "s-1");
    }

    #[tokio::test]
    async fn test_equal_values_are_not_republished() {
        let store = MemoryStore::new();
        assert_eq!(
            store.publish(ResourceKind::Groups, json!([])),
            PublishResult::Published
        );
        assert_eq!(
            store.publish(ResourceKind::Groups, json!([])),
            PublishResult::Unchanged
        );
        assert_eq!(
            store.publish(ResourceKind::Groups, json!([{ "groupID": "red" }])),
            PublishResult::Published
        );
    }

    #[tokio::test]
    async fn test_subsequent_values_are_delivered_in_order() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(ResourceKind::Groups).unwrap();

        store.publish(ResourceKind::Groups, json!([{ "groupID": "a" }]));
        assert_eq!(sub.next().await.unwrap().value()[0]["groupID"], "a");

        store.publish(ResourceKind::Groups, json!([{ "groupID": "b" }]));
        assert_eq!(sub.next().await.unwrap().value()[0]["groupID"], "b");
    }

    #[tokio::test]
    async fn test_dropped_store_closes_subscription() {
        let store = MemoryStore::with_snapshots([(ResourceKind::Scenes, json!({ "scenes": [] }))]);
        let mut sub = store.subscribe(ResourceKind::Scenes).unwrap();
        sub.next().await.unwrap();
        drop(store);
        assert!(matches!(sub.next().await, Err(StoreError::Closed(ResourceKind::Scenes))));
    }

    #[test]
    fn test_current() {
        let store = MemoryStore::new();
        assert!(store.current(ResourceKind::Scenes).is_none());
        store.publish(ResourceKind::Scenes, json!({ "scenes": [] }));
        assert!(store.current(ResourceKind::Scenes).is_some());
    }
}
