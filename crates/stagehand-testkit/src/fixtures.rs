//! Test fixtures and helpers.
//!
//! Record builders for every resource type plus a fixture that wires a
//! memory store to a memory consumer.

use std::sync::Arc;

use serde_json::{json, Value};

use stagehand::{Session, StagehandConfig};
use stagehand_core::{adapter_for, AdapterOptions, ResourceKind};
use stagehand_store::{MemoryStore, SnapshotStore};
use stagehand_sync::{memory_pair, ready_call, ConsumerModel, MemoryConsumer, MemoryTransport, Settings};

/// A control record.
pub fn control(id: &str) -> Value {
    json!({ "controlID": id, "kind": "button" })
}

/// A scene record holding `controls`.
pub fn scene(id: &str, controls: impl IntoIterator<Item = Value>) -> Value {
    json!({ "sceneID": id, "controls": controls.into_iter().collect::<Vec<_>>() })
}

/// A world snapshot holding `scenes` and no other world fields.
pub fn world(scenes: impl IntoIterator<Item = Value>) -> Value {
    json!({ "scenes": scenes.into_iter().collect::<Vec<_>>() })
}

/// A group record pointing at `scene_id`.
pub fn group(id: &str, scene_id: &str) -> Value {
    json!({ "groupID": id, "sceneID": scene_id })
}

/// A participant record in `group_id`.
pub fn participant(session_id: &str, group_id: &str) -> Value {
    json!({ "sessionID": session_id, "groupID": group_id })
}

/// A store and session configuration, ready to start sessions.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub config: StagehandConfig,
}

impl TestFixture {
    /// Create a fixture with an empty store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            config: StagehandConfig::default(),
        }
    }

    /// Create a fixture whose store holds a default scene with one control,
    /// a default group and one participant.
    pub fn populated() -> Self {
        let fixture = Self::new();
        fixture.publish(
            ResourceKind::Scenes,
            world([scene("default", [control("go")])]),
        );
        fixture.publish(ResourceKind::Groups, json!([group("default", "default")]));
        fixture.publish(ResourceKind::Participant, participant("s-1", "default"));
        fixture
    }

    /// Publish a snapshot to the store.
    pub fn publish(&self, kind: ResourceKind, value: Value) {
        self.store.publish(kind, value);
    }

    /// Start a session against this fixture's store.
    pub fn session(
        &self,
    ) -> stagehand::Result<(Session<MemoryStore, MemoryTransport>, MemoryConsumer)> {
        let (transport, consumer) = memory_pair();
        let session = Session::new(Arc::clone(&self.store), transport, self.config.clone())?;
        Ok((session, consumer))
    }

    /// The model a consumer holds right after bootstrapping the store's
    /// current snapshots with `settings`.
    ///
    /// `None` if some resource type has no snapshot yet.
    pub fn bootstrap_model(&self, settings: &Settings) -> Option<ConsumerModel> {
        let options = AdapterOptions::default();
        let mut calls = Vec::new();
        for kind in ResourceKind::ALL {
            let snapshot = self.store.current(kind)?;
            calls.extend(adapter_for(kind, &options).create_packet(snapshot.value()).ok()?);
        }
        calls.push(settings.to_call());
        calls.push(ready_call());
        ConsumerModel::from_calls(&calls).ok()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_populated_fixture_bootstraps() {
        let fixture = TestFixture::populated();
        let model = fixture.bootstrap_model(&Settings::default()).unwrap();
        assert_eq!(model.scenes.len(), 1);
        assert_eq!(model.groups.len(), 1);
        assert_eq!(model.participants.len(), 1);
        assert!(model.ready);
    }

    #[test]
    fn test_empty_fixture_has_no_model() {
        assert!(TestFixture::new()
            .bootstrap_model(&Settings::default())
            .is_none());
    }

    #[tokio::test]
    async fn test_session_reaches_consumer() {
        let fixture = TestFixture::populated();
        let (mut session, mut consumer) = fixture.session().unwrap();
        let handle = session.handle();
        let task = tokio::spawn(async move { session.run().await });

        consumer.connect().await.unwrap();
        consumer.ready().await.unwrap();

        let mut calls = Vec::new();
        while let Some(outbound) = consumer.next_call_timeout(Duration::from_millis(200)).await {
            calls.push(outbound.call);
        }
        let model = ConsumerModel::from_calls(&calls).unwrap();
        assert_eq!(
            Some(model),
            fixture.bootstrap_model(&Settings::default())
        );

        handle.shutdown().await.unwrap();
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.bootstraps, 1);
    }
}
