//! Golden diff vectors.
//!
//! Each vector fixes a pair of snapshots and the exact calls their diff must
//! produce, in order. They pin down the observable protocol: method names,
//! payload shapes and emission order.

use serde_json::{json, Value};

use stagehand_core::{adapter_for, AdapterOptions, Call, ResourceKind};

/// A golden diff vector.
#[derive(Debug, Clone)]
pub struct DiffVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Resource type the snapshots belong to.
    pub kind: ResourceKind,
    /// Snapshot the consumer already reflects.
    pub previous: Value,
    /// Snapshot to move to.
    pub next: Value,
    /// Expected calls, in order.
    pub expected: Vec<Call>,
}

/// Get all golden diff vectors.
pub fn all_vectors() -> Vec<DiffVector> {
    vec![
        DiffVector {
            name: "scene created from nothing",
            kind: ResourceKind::Scenes,
            previous: json!({ "scenes": [] }),
            next: json!({ "scenes": [{ "sceneID": "s1", "controls": [] }] }),
            expected: vec![Call::new(
                "onSceneCreate",
                json!({ "scenes": [{ "sceneID": "s1", "controls": [] }] }),
            )],
        },
        DiffVector {
            name: "control removed from surviving scene",
            kind: ResourceKind::Scenes,
            previous: json!({ "scenes": [{ "sceneID": "s1", "controls": [{ "controlID": "c1" }] }] }),
            next: json!({ "scenes": [{ "sceneID": "s1", "controls": [] }] }),
            expected: vec![Call::new(
                "onControlDelete",
                json!({ "sceneID": "s1", "controls": [{ "controlID": "c1" }] }),
            )],
        },
        DiffVector {
            name: "scene identifier replaced in place",
            kind: ResourceKind::Scenes,
            previous: json!({ "scenes": [{ "sceneID": "a", "controls": [] }] }),
            next: json!({ "scenes": [{ "sceneID": "b", "controls": [] }] }),
            expected: vec![
                Call::new(
                    "onSceneDelete",
                    json!({ "sceneID": "a", "reassignSceneID": "default" }),
                ),
                Call::new(
                    "onSceneCreate",
                    json!({ "scenes": [{ "sceneID": "b", "controls": [] }] }),
                ),
            ],
        },
        DiffVector {
            name: "scene update omits nested controls",
            kind: ResourceKind::Scenes,
            previous: json!({ "scenes": [
                { "sceneID": "s1", "title": "Lobby", "controls": [{ "controlID": "c1" }] }
            ] }),
            next: json!({ "scenes": [
                { "sceneID": "s1", "title": "Arena", "controls": [{ "controlID": "c1", "text": "Go" }] }
            ] }),
            expected: vec![
                Call::new(
                    "onSceneUpdate",
                    json!({ "scenes": [{ "sceneID": "s1", "title": "Arena" }] }),
                ),
                Call::new(
                    "onControlUpdate",
                    json!({ "sceneID": "s1", "controls": [{ "controlID": "c1", "text": "Go" }] }),
                ),
            ],
        },
        DiffVector {
            name: "world fields changed",
            kind: ResourceKind::Scenes,
            previous: json!({ "scenes": [], "round": 1 }),
            next: json!({ "scenes": [], "round": 2 }),
            expected: vec![Call::new("onWorldUpdate", json!({ "round": 2 }))],
        },
        DiffVector {
            name: "destroy before create before update",
            kind: ResourceKind::Groups,
            previous: json!([{ "groupID": "red", "open": true }, { "groupID": "blue" }]),
            next: json!([{ "groupID": "red", "open": false }, { "groupID": "green" }]),
            expected: vec![
                Call::new(
                    "onGroupDelete",
                    json!({ "groupID": "blue", "reassignGroupID": "default" }),
                ),
                Call::new("onGroupCreate", json!({ "groups": [{ "groupID": "green" }] })),
                Call::new(
                    "onGroupUpdate",
                    json!({ "groups": [{ "groupID": "red", "open": false }] }),
                ),
            ],
        },
        DiffVector {
            name: "group removed from the front",
            kind: ResourceKind::Groups,
            previous: json!([{ "groupID": "red" }, { "groupID": "blue" }]),
            next: json!([{ "groupID": "blue" }]),
            expected: vec![Call::new(
                "onGroupDelete",
                json!({ "groupID": "red", "reassignGroupID": "default" }),
            )],
        },
        DiffVector {
            name: "participant joins",
            kind: ResourceKind::Participant,
            previous: Value::Null,
            next: json!({ "sessionID": "s-1", "groupID": "default" }),
            expected: vec![Call::new(
                "onParticipantJoin",
                json!({ "participants": [{ "sessionID": "s-1", "groupID": "default" }] }),
            )],
        },
        DiffVector {
            name: "participant leaves",
            kind: ResourceKind::Participant,
            previous: json!({ "sessionID": "s-1", "groupID": "default" }),
            next: Value::Null,
            expected: vec![Call::new(
                "onParticipantLeave",
                json!({ "participants": [{ "sessionID": "s-1" }] }),
            )],
        },
    ]
}

/// Diff a vector's snapshots with the built-in adapter for its kind.
pub fn run_vector(vector: &DiffVector) -> stagehand_core::Result<Vec<Call>> {
    let adapter = adapter_for(vector.kind, &AdapterOptions::default());
    Ok(adapter.diff(&vector.previous, &vector.next)?.calls)
}

/// Run every vector and report whether each one matched.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    all_vectors()
        .iter()
        .map(|v| {
            let matches = run_vector(v).map_or(false, |calls| calls == v.expected);
            (v.name.to_string(), matches)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for vector in all_vectors() {
            let calls = run_vector(&vector).unwrap();
            assert_eq!(calls, vector.expected, "vector: {}", vector.name);
        }
    }

    #[test]
    fn test_verify_all_vectors_reports_every_vector() {
        let results = verify_all_vectors();
        assert_eq!(results.len(), all_vectors().len());
        assert!(results.iter().all(|(_, ok)| *ok));
    }

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            assert_eq!(run_vector(&vector).unwrap(), run_vector(&vector).unwrap());
        }
    }
}
