//! Proptest generators for property-based testing.
//!
//! Every generated snapshot is well-formed: identifiers are unique within
//! their collection and records come in arbitrary order. Identifiers are
//! drawn from a small alphabet so that consecutive snapshots share records.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use stagehand_core::ResourceKind;

/// Generate a short identifier.
pub fn resource_id() -> impl Strategy<Value = String> {
    "[a-f]".prop_map(String::from)
}

/// Generate a flat map of scalar fields, none named like an identifier.
pub fn fields() -> impl Strategy<Value = Map<String, Value>> {
    let scalar = prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        (0i64..4).prop_map(|n| json!(n)),
        "[xyz]{1,2}".prop_map(Value::String),
    ];
    prop::collection::btree_map("(title|cost|disabled|meta)", scalar, 0..3)
        .prop_map(|fields| fields.into_iter().collect())
}

fn keyed(
    id_field: &'static str,
    records: BTreeMap<String, Map<String, Value>>,
) -> impl Strategy<Value = Vec<Value>> {
    let records: Vec<Value> = records
        .into_iter()
        .map(|(id, mut fields)| {
            fields.insert(id_field.to_string(), Value::String(id));
            Value::Object(fields)
        })
        .collect();
    Just(records).prop_shuffle()
}

/// Generate a list of controls with unique `controlID`s.
pub fn controls() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::btree_map(resource_id(), fields(), 0..4)
        .prop_flat_map(|records| keyed("controlID", records))
}

/// Generate a scene record without its identifier.
fn scene_body() -> impl Strategy<Value = Map<String, Value>> {
    (fields(), controls()).prop_map(|(mut fields, controls)| {
        fields.insert("controls".to_string(), Value::Array(controls));
        fields
    })
}

/// Generate a list of scenes with unique `sceneID`s, each with controls.
pub fn scenes() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::btree_map(resource_id(), scene_body(), 0..5)
        .prop_flat_map(|records| keyed("sceneID", records))
}

/// Generate a world snapshot.
pub fn world() -> impl Strategy<Value = Value> {
    (scenes(), prop::option::of(0i64..3)).prop_map(|(scenes, round)| {
        let mut world = json!({ "scenes": scenes });
        if let Some(round) = round {
            world["round"] = json!(round);
        }
        world
    })
}

/// Generate a groups snapshot.
pub fn groups() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(resource_id(), fields(), 0..5)
        .prop_flat_map(|records| keyed("groupID", records))
        .prop_map(Value::Array)
}

/// Generate a participant snapshot: a record or `null`.
pub fn participant() -> impl Strategy<Value = Value> {
    prop::option::of((resource_id(), fields())).prop_map(|participant| match participant {
        Some((id, mut fields)) => {
            fields.insert("sessionID".to_string(), Value::String(id));
            Value::Object(fields)
        }
        None => Value::Null,
    })
}

/// Generate a snapshot of `kind`.
pub fn snapshot(kind: ResourceKind) -> BoxedStrategy<Value> {
    match kind {
        ResourceKind::Scenes => world().boxed(),
        ResourceKind::Groups => groups().boxed(),
        ResourceKind::Participant => participant().boxed(),
    }
}

/// Generate a resource kind.
pub fn resource_kind() -> impl Strategy<Value = ResourceKind> {
    prop_oneof![
        Just(ResourceKind::Scenes),
        Just(ResourceKind::Groups),
        Just(ResourceKind::Participant),
    ]
}

/// Generate a kind together with two consecutive snapshots of it.
pub fn snapshot_pair() -> impl Strategy<Value = (ResourceKind, Value, Value)> {
    resource_kind().prop_flat_map(|kind| (Just(kind), snapshot(kind), snapshot(kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use stagehand_core::{adapter_for, identify, AdapterOptions};
    use stagehand_sync::verify_convergence;

    fn unique_ids(records: &[Value], id_field: &str) -> bool {
        let ids: Vec<_> = records.iter().filter_map(|r| identify(r, id_field)).collect();
        let unique: HashSet<_> = ids.iter().collect();
        ids.len() == records.len() && unique.len() == ids.len()
    }

    proptest! {
        #[test]
        fn test_generated_scenes_are_well_formed(scenes in scenes()) {
            prop_assert!(unique_ids(&scenes, "sceneID"));
            for scene in &scenes {
                let controls = scene["controls"].as_array().unwrap();
                prop_assert!(unique_ids(controls, "controlID"));
            }
        }

        #[test]
        fn test_diff_converges_for_every_kind((kind, previous, next) in snapshot_pair()) {
            let adapter = adapter_for(kind, &AdapterOptions::default());
            let result = verify_convergence(adapter.as_ref(), &previous, &next).unwrap();
            prop_assert!(result.is_converged(), "{}: {:?}", kind, result);
        }

        #[test]
        fn test_identical_snapshots_diff_to_nothing((kind, snapshot, _) in snapshot_pair()) {
            let adapter = adapter_for(kind, &AdapterOptions::default());
            let comparison = adapter.diff(&snapshot, &snapshot).unwrap();
            prop_assert!(comparison.is_empty());
            prop_assert_eq!(comparison.unidentified, 0);
        }
    }
}
