//! Convergence verification.
//!
//! A [`ConsumerModel`] is what a consumer builds from the calls it receives:
//! records keyed by identifier at every level. Replaying
//! `bootstrap(A) + diff(A, B)` must leave the model in the same state as
//! `bootstrap(B)`; comparing state hashes checks exactly that.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use stagehand_core::protocol::{fields, methods};
use stagehand_core::{identify, Call, Fingerprint, ResourceAdapter, ResourceId};

use crate::error::{Result, SyncError};

/// A scene as the consumer holds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneState {
    /// Scene fields other than its controls.
    pub fields: Map<String, Value>,
    /// Controls keyed by identifier.
    pub controls: BTreeMap<ResourceId, Value>,
}

/// The consumer's view of everything it has been told.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsumerModel {
    pub scenes: BTreeMap<ResourceId, SceneState>,
    pub groups: BTreeMap<ResourceId, Value>,
    pub participants: BTreeMap<ResourceId, Value>,
    pub world: Map<String, Value>,
    pub settings: Option<Value>,
    pub ready: bool,
}

impl ConsumerModel {
    /// Build a model from a sequence of calls.
    pub fn from_calls<'a>(calls: impl IntoIterator<Item = &'a Call>) -> Result<Self> {
        let mut model = Self::default();
        model.apply_all(calls)?;
        Ok(model)
    }

    /// Apply calls in order, stopping at the first rejected one.
    pub fn apply_all<'a>(&mut self, calls: impl IntoIterator<Item = &'a Call>) -> Result<()> {
        calls.into_iter().try_for_each(|call| self.apply(call))
    }

    /// Apply one call.
    ///
    /// Creating a record that exists, or touching one that does not, is
    /// rejected: a correct call stream never does either.
    pub fn apply(&mut self, call: &Call) -> Result<()> {
        let params = &call.params;
        match call.method.as_str() {
            methods::SCENE_CREATE => {
                for scene in records(params, fields::SCENES)? {
                    let id = require_id(scene, fields::SCENE_ID)?;
                    let state = scene_state(scene)?;
                    insert_new(&mut self.scenes, id, state)?;
                }
            }
            methods::SCENE_UPDATE => {
                for scene in records(params, fields::SCENES)? {
                    let id = require_id(scene, fields::SCENE_ID)?;
                    let state = existing(&mut self.scenes, &id)?;
                    state.fields = without(scene, fields::CONTROLS);
                }
            }
            methods::SCENE_DELETE => {
                let id = require_id(params, fields::SCENE_ID)?;
                remove_existing(&mut self.scenes, &id)?;
            }
            methods::CONTROL_CREATE => {
                let scene = self.scene_for(params)?;
                for control in records(params, fields::CONTROLS)? {
                    let id = require_id(control, fields::CONTROL_ID)?;
                    insert_new(&mut scene.controls, id, control.clone())?;
                }
            }
            methods::CONTROL_UPDATE => {
                let scene = self.scene_for(params)?;
                for control in records(params, fields::CONTROLS)? {
                    let id = require_id(control, fields::CONTROL_ID)?;
                    *existing(&mut scene.controls, &id)? = control.clone();
                }
            }
            methods::CONTROL_DELETE => {
                let scene = self.scene_for(params)?;
                for control in records(params, fields::CONTROLS)? {
                    let id = require_id(control, fields::CONTROL_ID)?;
                    remove_existing(&mut scene.controls, &id)?;
                }
            }
            methods::GROUP_CREATE => {
                for group in records(params, fields::GROUPS)? {
                    let id = require_id(group, fields::GROUP_ID)?;
                    insert_new(&mut self.groups, id, group.clone())?;
                }
            }
            methods::GROUP_UPDATE => {
                for group in records(params, fields::GROUPS)? {
                    let id = require_id(group, fields::GROUP_ID)?;
                    *existing(&mut self.groups, &id)? = group.clone();
                }
            }
            methods::GROUP_DELETE => {
                let id = require_id(params, fields::GROUP_ID)?;
                remove_existing(&mut self.groups, &id)?;
            }
            methods::PARTICIPANT_JOIN => {
                for participant in records(params, fields::PARTICIPANTS)? {
                    let id = require_id(participant, fields::SESSION_ID)?;
                    insert_new(&mut self.participants, id, participant.clone())?;
                }
            }
            methods::PARTICIPANT_UPDATE => {
                for participant in records(params, fields::PARTICIPANTS)? {
                    let id = require_id(participant, fields::SESSION_ID)?;
                    *existing(&mut self.participants, &id)? = participant.clone();
                }
            }
            methods::PARTICIPANT_LEAVE => {
                for participant in records(params, fields::PARTICIPANTS)? {
                    let id = require_id(participant, fields::SESSION_ID)?;
                    remove_existing(&mut self.participants, &id)?;
                }
            }
            methods::WORLD_UPDATE => {
                self.world = params
                    .as_object()
                    .cloned()
                    .ok_or_else(|| invalid("world update is not an object"))?;
            }
            methods::SETTINGS_UPDATE => {
                self.settings = Some(params.clone());
            }
            methods::READY => {
                self.ready = params
                    .get(fields::IS_READY)
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
            }
            other => return Err(invalid(format!("unknown method {}", other))),
        }
        Ok(())
    }

    /// Deterministic digest of the whole model.
    pub fn state_hash(&self) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"stagehand-consumer-v0:");
        hasher.update(&serde_json::to_vec(self).unwrap_or_default());
        Fingerprint(*hasher.finalize().as_bytes())
    }

    fn scene_for(&mut self, params: &Value) -> Result<&mut SceneState> {
        let id = require_id(params, fields::SCENE_ID)?;
        existing(&mut self.scenes, &id)
    }
}

/// Result of convergence verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// The incremental path and a fresh bootstrap agree.
    Converged,
    /// Both paths applied cleanly but ended in different states.
    Diverged {
        expected: Fingerprint,
        actual: Fingerprint,
    },
    /// The consumer model rejected a call on the incremental path.
    Rejected { reason: String },
}

impl ConvergenceResult {
    /// Check if the two paths converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }
}

/// Verify that diffing `previous` into `next` is equivalent to
/// bootstrapping `next` from nothing.
pub fn verify_convergence(
    adapter: &dyn ResourceAdapter,
    previous: &Value,
    next: &Value,
) -> Result<ConvergenceResult> {
    let expected = ConsumerModel::from_calls(&adapter.create_packet(next)?)?;

    let mut incremental = ConsumerModel::from_calls(&adapter.create_packet(previous)?)?;
    let diff = adapter.diff(previous, next)?;
    if let Err(e) = incremental.apply_all(&diff.calls) {
        return Ok(ConvergenceResult::Rejected {
            reason: e.to_string(),
        });
    }

    let expected_hash = expected.state_hash();
    let actual_hash = incremental.state_hash();
    if expected_hash == actual_hash {
        Ok(ConvergenceResult::Converged)
    } else {
        Ok(ConvergenceResult::Diverged {
            expected: expected_hash,
            actual: actual_hash,
        })
    }
}

fn invalid(reason: impl Into<String>) -> SyncError {
    SyncError::InvalidMessage(reason.into())
}

fn records<'a>(params: &'a Value, field: &str) -> Result<&'a [Value]> {
    params
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| invalid(format!("`{}` is not an array", field)))
}

fn require_id(record: &Value, field: &str) -> Result<ResourceId> {
    identify(record, field).ok_or_else(|| invalid(format!("record without `{}`", field)))
}

fn without(record: &Value, field: &str) -> Map<String, Value> {
    record
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(k, _)| k.as_str() != field)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn scene_state(scene: &Value) -> Result<SceneState> {
    let mut controls = BTreeMap::new();
    if let Some(list) = scene.get(fields::CONTROLS).and_then(Value::as_array) {
        for control in list {
            let id = require_id(control, fields::CONTROL_ID)?;
            insert_new(&mut controls, id, control.clone())?;
        }
    }
    Ok(SceneState {
        fields: without(scene, fields::CONTROLS),
        controls,
    })
}

fn insert_new<V>(map: &mut BTreeMap<ResourceId, V>, id: ResourceId, value: V) -> Result<()> {
    if map.contains_key(&id) {
        return Err(invalid(format!("{} already exists", id)));
    }
    map.insert(id, value);
    Ok(())
}

fn existing<'a, V>(map: &'a mut BTreeMap<ResourceId, V>, id: &ResourceId) -> Result<&'a mut V> {
    map.get_mut(id)
        .ok_or_else(|| invalid(format!("{} does not exist", id)))
}

fn remove_existing<V>(map: &mut BTreeMap<ResourceId, V>, id: &ResourceId) -> Result<()> {
    map.remove(id)
        .map(|_| ())
        .ok_or_else(|| invalid(format!("{} does not exist", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use stagehand_core::resources::{GroupsAdapter, ParticipantAdapter, ScenesAdapter};

    #[test]
    fn test_model_from_bootstrap() {
        let adapter = ScenesAdapter::new("default");
        let world = json!({
            "scenes": [{ "sceneID": "lobby", "controls": [{ "controlID": "go" }] }],
            "round": 1,
        });
        let model = ConsumerModel::from_calls(&adapter.create_packet(&world).unwrap()).unwrap();

        let lobby = &model.scenes[&ResourceId::new("lobby")];
        assert!(lobby.controls.contains_key(&ResourceId::new("go")));
        assert_eq!(model.world["round"], 1);
    }

    #[test]
    fn test_model_rejects_duplicate_create() {
        let call = Call::new("onGroupCreate", json!({ "groups": [{ "groupID": "a" }] }));
        let mut model = ConsumerModel::default();
        model.apply(&call).unwrap();
        assert!(matches!(model.apply(&call), Err(SyncError::InvalidMessage(_))));
    }

    #[test]
    fn test_model_rejects_update_of_unknown_record() {
        let call = Call::new(
            "onControlUpdate",
            json!({ "sceneID": "ghost", "controls": [{ "controlID": "c" }] }),
        );
        assert!(ConsumerModel::default().apply(&call).is_err());
    }

    #[test]
    fn test_model_rejects_unknown_method() {
        let call = Call::new("onSomething", json!({}));
        assert!(ConsumerModel::default().apply(&call).is_err());
    }

    #[test]
    fn test_state_hash_tracks_content() {
        let a = ConsumerModel::default();
        let mut b = ConsumerModel::default();
        assert_eq!(a.state_hash(), b.state_hash());

        b.apply(&Call::new("onReady", json!({ "isReady": true })))
            .unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_scene_update_keeps_controls() {
        let adapter = ScenesAdapter::new("default");
        let before = json!({ "scenes": [
            { "sceneID": "s", "title": "old", "controls": [{ "controlID": "c" }] }
        ]});
        let after = json!({ "scenes": [
            { "sceneID": "s", "title": "new", "controls": [{ "controlID": "c" }] }
        ]});
        assert!(verify_convergence(&adapter, &before, &after)
            .unwrap()
            .is_converged());
    }

    #[test]
    fn test_replaced_identifier_converges() {
        let adapter = GroupsAdapter::new("default");
        let before = json!([{ "groupID": "a" }, { "groupID": "b" }]);
        let after = json!([{ "groupID": "c" }, { "groupID": "b", "x": 1 }]);
        assert!(verify_convergence(&adapter, &before, &after)
            .unwrap()
            .is_converged());
    }

    #[test]
    fn test_participant_leave_and_join_converge() {
        let adapter = ParticipantAdapter::new();
        let before = json!({ "sessionID": "s-1", "groupID": "default" });
        assert!(verify_convergence(&adapter, &before, &Value::Null)
            .unwrap()
            .is_converged());
        assert!(verify_convergence(&adapter, &Value::Null, &before)
            .unwrap()
            .is_converged());
    }

    #[test]
    fn test_malformed_snapshot_is_an_error() {
        let adapter = GroupsAdapter::new("default");
        let result = verify_convergence(&adapter, &json!([]), &json!({ "groups": [] }));
        assert!(matches!(result, Err(SyncError::SnapshotError(_))));
    }

    fn control_body() -> impl Strategy<Value = Option<u8>> {
        prop::option::of(0u8..3)
    }

    fn scene_body() -> impl Strategy<Value = (Option<String>, BTreeMap<String, Option<u8>>)> {
        (
            prop::option::of("[xy]"),
            prop::collection::btree_map("[a-e]", control_body(), 0..4),
        )
    }

    fn world() -> impl Strategy<Value = Value> {
        (
            prop::collection::btree_map("[a-e]", scene_body(), 0..5),
            prop::option::of(0u8..3),
        )
            .prop_flat_map(|(scenes, round)| {
                let scenes: Vec<Value> = scenes
                    .into_iter()
                    .map(|(id, (title, controls))| {
                        let controls: Vec<Value> = controls
                            .into_iter()
                            .map(|(control_id, weight)| match weight {
                                Some(w) => json!({ "controlID": control_id, "weight": w }),
                                None => json!({ "controlID": control_id }),
                            })
                            .collect();
                        let mut record = json!({ "sceneID": id, "controls": controls });
                        if let Some(t) = title {
                            record["title"] = json!(t);
                        }
                        record
                    })
                    .collect();
                (Just(scenes).prop_shuffle(), Just(round))
            })
            .prop_map(|(scenes, round)| {
                let mut world = json!({ "scenes": scenes });
                if let Some(r) = round {
                    world["round"] = json!(r);
                }
                world
            })
    }

    proptest! {
        #[test]
        fn test_diff_converges_with_fresh_bootstrap(previous in world(), next in world()) {
            let adapter = ScenesAdapter::new("default");
            let result = verify_convergence(&adapter, &previous, &next).unwrap();
            prop_assert!(result.is_converged(), "{:?}", result);
        }
    }
}
