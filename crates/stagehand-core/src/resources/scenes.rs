//! Scenes, their controls, and the surrounding world.
//!
//! The scenes snapshot is a world object. Its `scenes` field is the
//! collection; every other field is world state sent with `onWorldUpdate`.

use serde_json::{json, Map, Value};

use super::{context_field, record_field, ResourceAdapter};
use crate::call::Call;
use crate::comparator::{ComparatorConfig, Comparison, ResourceComparator};
use crate::error::{CoreError, Result};
use crate::protocol::{fields, methods};
use crate::types::ResourceKind;

/// Comparator configuration for controls nested in a scene.
pub fn control_comparator() -> ComparatorConfig {
    ComparatorConfig::new(fields::CONTROL_ID)
        .on_create(|records: &[Value], scene: Option<&Value>| {
            Call::new(
                methods::CONTROL_CREATE,
                json!({
                    "sceneID": context_field(scene, fields::SCENE_ID),
                    "controls": records,
                }),
            )
        })
        .on_update(|records: &[Value], scene: Option<&Value>| {
            Call::new(
                methods::CONTROL_UPDATE,
                json!({
                    "sceneID": context_field(scene, fields::SCENE_ID),
                    "controls": records,
                }),
            )
        })
        .on_destroy(|records: &[Value], scene: Option<&Value>| {
            let controls: Vec<Value> = records
                .iter()
                .map(|r| json!({ "controlID": record_field(r, fields::CONTROL_ID) }))
                .collect();
            Call::new(
                methods::CONTROL_DELETE,
                json!({
                    "sceneID": context_field(scene, fields::SCENE_ID),
                    "controls": controls,
                }),
            )
        })
}

/// Comparator configuration for scenes, including nested controls.
///
/// Deleted scenes are announced one call each, carrying `reassign_to`.
pub fn scene_comparator(reassign_to: impl Into<String>) -> ComparatorConfig {
    let reassign_to: String = reassign_to.into();
    ComparatorConfig::new(fields::SCENE_ID)
        .on_create(|records: &[Value], _: Option<&Value>| {
            Call::new(methods::SCENE_CREATE, json!({ "scenes": records }))
        })
        .on_update(|records: &[Value], _: Option<&Value>| {
            Call::new(methods::SCENE_UPDATE, json!({ "scenes": records }))
        })
        .on_destroy(move |records: &[Value], _: Option<&Value>| {
            records
                .iter()
                .map(|r| {
                    Call::new(
                        methods::SCENE_DELETE,
                        json!({
                            "sceneID": record_field(r, fields::SCENE_ID),
                            "reassignSceneID": reassign_to,
                        }),
                    )
                })
                .collect::<Vec<_>>()
        })
        .nested(fields::CONTROLS, control_comparator())
}

/// Adapter for the world/scenes snapshot.
#[derive(Debug, Clone)]
pub struct ScenesAdapter {
    comparator: ResourceComparator,
}

impl ScenesAdapter {
    pub fn new(reassign_scene_id: &str) -> Self {
        Self {
            comparator: ResourceComparator::new(scene_comparator(reassign_scene_id)),
        }
    }

    /// Split a world snapshot into its scenes and the remaining world fields.
    fn split<'a>(&self, snapshot: &'a Value) -> Result<(&'a [Value], Map<String, Value>)> {
        let world = snapshot
            .as_object()
            .ok_or_else(|| CoreError::malformed(ResourceKind::Scenes, "world is not an object"))?;

        let scenes = match world.get(fields::SCENES) {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(scenes)) => scenes.as_slice(),
            Some(_) => {
                return Err(CoreError::malformed(
                    ResourceKind::Scenes,
                    "`scenes` is not an array",
                ))
            }
        };

        let rest = world
            .iter()
            .filter(|(k, _)| k.as_str() != fields::SCENES)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok((scenes, rest))
    }
}

impl ResourceAdapter for ScenesAdapter {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Scenes
    }

    fn diff(&self, previous: &Value, next: &Value) -> Result<Comparison> {
        let (prev_scenes, prev_world) = self.split(previous)?;
        let (next_scenes, next_world) = self.split(next)?;

        let mut comparison = self.comparator.diff(prev_scenes, next_scenes, None);
        if prev_world != next_world {
            comparison
                .calls
                .push(Call::new(methods::WORLD_UPDATE, Value::Object(next_world)));
        }
        Ok(comparison)
    }

    fn create_packet(&self, snapshot: &Value) -> Result<Vec<Call>> {
        let (scenes, world) = self.split(snapshot)?;
        let mut calls = self.comparator.compare(&[], scenes, None);
        calls.push(Call::new(methods::WORLD_UPDATE, Value::Object(world)));
        Ok(calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ScenesAdapter {
        ScenesAdapter::new("default")
    }

    #[test]
    fn test_create_packet_creates_scenes_then_world() {
        let world = json!({
            "scenes": [{ "sceneID": "default", "controls": [{ "controlID": "go" }] }],
            "cooldown": 5,
        });
        let calls = adapter().create_packet(&world).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, methods::SCENE_CREATE);
        assert_eq!(calls[0].params["scenes"][0]["controls"][0]["controlID"], "go");
        assert_eq!(calls[1], Call::new(methods::WORLD_UPDATE, json!({ "cooldown": 5 })));
    }

    #[test]
    fn test_create_packet_for_empty_world() {
        let calls = adapter().create_packet(&json!({})).unwrap();
        assert_eq!(calls, vec![Call::new(methods::WORLD_UPDATE, json!({}))]);
    }

    #[test]
    fn test_world_change_appends_world_update() {
        let prev = json!({ "scenes": [{ "sceneID": "a" }], "theme": "dark" });
        let next = json!({ "scenes": [{ "sceneID": "a" }, { "sceneID": "b" }], "theme": "light" });
        let comparison = adapter().diff(&prev, &next).unwrap();
        let methods_seen: Vec<&str> = comparison.calls.iter().map(|c| c.method.as_str()).collect();
        assert_eq!(methods_seen, vec![methods::SCENE_CREATE, methods::WORLD_UPDATE]);
        assert_eq!(comparison.calls[1].params, json!({ "theme": "light" }));
    }

    #[test]
    fn test_unchanged_world_emits_nothing() {
        let world = json!({ "scenes": [{ "sceneID": "a", "controls": [] }], "theme": "dark" });
        assert!(adapter().diff(&world, &world).unwrap().is_empty());
    }

    #[test]
    fn test_scene_delete_carries_reassignment() {
        let prev = json!({ "scenes": [{ "sceneID": "a" }, { "sceneID": "b" }] });
        let next = json!({ "scenes": [{ "sceneID": "a" }] });
        let calls = ScenesAdapter::new("lobby").diff(&prev, &next).unwrap().calls;
        assert_eq!(
            calls,
            vec![Call::new(
                methods::SCENE_DELETE,
                json!({ "sceneID": "b", "reassignSceneID": "lobby" })
            )]
        );
    }

    #[test]
    fn test_control_update_addresses_parent_scene() {
        let prev = json!({ "scenes": [{ "sceneID": "a", "controls": [{ "controlID": "c", "text": "x" }] }] });
        let next = json!({ "scenes": [{ "sceneID": "a", "controls": [{ "controlID": "c", "text": "y" }] }] });
        let calls = adapter().diff(&prev, &next).unwrap().calls;
        assert_eq!(
            calls,
            vec![Call::new(
                methods::CONTROL_UPDATE,
                json!({ "sceneID": "a", "controls": [{ "controlID": "c", "text": "y" }] })
            )]
        );
    }

    #[test]
    fn test_malformed_world_is_rejected() {
        assert!(adapter().create_packet(&json!([])).is_err());
        assert!(adapter().create_packet(&json!({ "scenes": 3 })).is_err());
    }
}
