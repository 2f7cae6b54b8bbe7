//! Resource comparator: minimal create/update/destroy calls between two
//! snapshots of an identifier-keyed collection.
//!
//! ## Algorithm
//!
//! 1. Strip declared nested collections from both sides and generate an
//!    RFC 6902 patch between the two top-level arrays with [`json_patch`].
//! 2. Replay the patch against a working copy of `previous`, classifying
//!    each operation by the identifier found at its slot:
//!    - anything touching a whole record, or a record's identifier field,
//!      destroys the identifier that was there and creates the identifier
//!      that is there afterwards (when they differ);
//!    - anything else marks the slot's identifier for update.
//! 3. Resolve the sets. Identifiers marked destroyed or created that exist
//!    on both sides were only shifted to another slot ("moved survivors");
//!    they leave both sets and are re-checked against their own previous
//!    record. Updates exclude anything created or destroyed.
//! 4. Emit destroy, then create, then update.
//! 5. Recurse into nested collections of every survivor, passing the next
//!    record as context.
//!
//! The comparator never fails. Records it cannot identify are skipped and
//! counted in [`Comparison::unidentified`] so the caller can log them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use json_patch::PatchOperation;
use serde_json::Value;

use crate::call::{Call, IntoCalls};
use crate::types::{identify, ResourceId};

type BuildFn = Arc<dyn Fn(&[Value], Option<&Value>) -> Vec<Call> + Send + Sync>;

/// Declarative configuration for one level of a resource comparator.
///
/// Each builder receives the affected records and the parent record (for
/// nested levels). `on_create` gets full next records, `on_update` gets next
/// records with nested collections pruned, and `on_destroy` gets the
/// previous records so it can pick out whatever identifying fields it needs.
#[derive(Clone)]
pub struct ComparatorConfig {
    id_field: String,
    on_create: Option<BuildFn>,
    on_update: Option<BuildFn>,
    on_destroy: Option<BuildFn>,
    nested: Vec<(String, ComparatorConfig)>,
}

impl ComparatorConfig {
    /// Start a configuration keyed by `id_field`.
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            on_create: None,
            on_update: None,
            on_destroy: None,
            nested: Vec::new(),
        }
    }

    /// Set the builder for newly appeared records.
    pub fn on_create<F, R>(mut self, build: F) -> Self
    where
        F: Fn(&[Value], Option<&Value>) -> R + Send + Sync + 'static,
        R: IntoCalls,
    {
        self.on_create = Some(Arc::new(move |records: &[Value], ctx: Option<&Value>| {
            build(records, ctx).into_calls()
        }));
        self
    }

    /// Set the builder for changed records.
    pub fn on_update<F, R>(mut self, build: F) -> Self
    where
        F: Fn(&[Value], Option<&Value>) -> R + Send + Sync + 'static,
        R: IntoCalls,
    {
        self.on_update = Some(Arc::new(move |records: &[Value], ctx: Option<&Value>| {
            build(records, ctx).into_calls()
        }));
        self
    }

    /// Set the builder for records that disappeared.
    pub fn on_destroy<F, R>(mut self, build: F) -> Self
    where
        F: Fn(&[Value], Option<&Value>) -> R + Send + Sync + 'static,
        R: IntoCalls,
    {
        self.on_destroy = Some(Arc::new(move |records: &[Value], ctx: Option<&Value>| {
            build(records, ctx).into_calls()
        }));
        self
    }

    /// Declare a nested collection under `field`, diffed with `config`.
    pub fn nested(mut self, field: impl Into<String>, config: ComparatorConfig) -> Self {
        self.nested.push((field.into(), config));
        self
    }

    /// The identifier field name.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }
}

impl fmt::Debug for ComparatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparatorConfig")
            .field("id_field", &self.id_field)
            .field("on_create", &self.on_create.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .field("nested", &self.nested)
            .finish()
    }
}

/// Identifier sets produced by classifying one level of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Identifiers that disappeared, in previous order.
    pub destroy: Vec<ResourceId>,
    /// Identifiers that appeared, in next order.
    pub create: Vec<ResourceId>,
    /// Surviving identifiers whose non-nested fields changed, in next order.
    pub update: Vec<ResourceId>,
    /// Records on either side with no usable identifier, or with an
    /// identifier already used earlier in the same snapshot.
    pub unidentified: usize,
}

impl Classification {
    /// True when nothing changed at this level.
    pub fn is_empty(&self) -> bool {
        self.destroy.is_empty() && self.create.is_empty() && self.update.is_empty()
    }
}

/// Result of a full comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    /// Calls in emission order.
    pub calls: Vec<Call>,
    /// Unidentifiable records across every level.
    pub unidentified: usize,
}

impl Comparison {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// A compiled comparator for one resource type.
#[derive(Debug, Clone)]
pub struct ResourceComparator {
    config: ComparatorConfig,
    nested: Vec<(String, ResourceComparator)>,
}

impl ResourceComparator {
    /// Build a comparator, recursively compiling nested levels.
    pub fn new(config: ComparatorConfig) -> Self {
        let nested = config
            .nested
            .iter()
            .map(|(field, nested)| (field.clone(), ResourceComparator::new(nested.clone())))
            .collect();
        Self { config, nested }
    }

    /// The configuration this comparator was built from.
    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Compare two snapshots and return the calls only.
    pub fn compare(&self, previous: &[Value], next: &[Value], context: Option<&Value>) -> Vec<Call> {
        self.diff(previous, next, context).calls
    }

    /// Compare two snapshots.
    pub fn diff(&self, previous: &[Value], next: &[Value], context: Option<&Value>) -> Comparison {
        let classification = self.classify(previous, next);
        let mut unidentified = classification.unidentified;

        let prev_index = index_records(previous, &self.config.id_field).0;
        let next_index = index_records(next, &self.config.id_field).0;

        let mut calls = Vec::new();

        if let Some(build) = &self.config.on_destroy {
            if !classification.destroy.is_empty() {
                let records: Vec<Value> = classification
                    .destroy
                    .iter()
                    .filter_map(|id| prev_index.get(id).map(|r| (*r).clone()))
                    .collect();
                calls.extend(build(&records, context));
            }
        }

        if let Some(build) = &self.config.on_create {
            if !classification.create.is_empty() {
                let records: Vec<Value> = classification
                    .create
                    .iter()
                    .filter_map(|id| next_index.get(id).map(|r| (*r).clone()))
                    .collect();
                calls.extend(build(&records, context));
            }
        }

        if let Some(build) = &self.config.on_update {
            if !classification.update.is_empty() {
                let records: Vec<Value> = classification
                    .update
                    .iter()
                    .filter_map(|id| next_index.get(id).map(|r| self.prune(r)))
                    .collect();
                calls.extend(build(&records, context));
            }
        }

        if !self.nested.is_empty() {
            for record in next {
                let Some(id) = identify(record, &self.config.id_field) else {
                    continue;
                };
                // Only the first occurrence of an identifier is indexed.
                if !next_index.get(&id).is_some_and(|r| std::ptr::eq(*r, record)) {
                    continue;
                }
                let Some(prev_record) = prev_index.get(&id) else {
                    continue;
                };
                for (field, comparator) in &self.nested {
                    let nested = comparator.diff(
                        collection(prev_record, field),
                        collection(record, field),
                        Some(record),
                    );
                    calls.extend(nested.calls);
                    unidentified += nested.unidentified;
                }
            }
        }

        Comparison {
            calls,
            unidentified,
        }
    }

    /// Classify one level into destroy/create/update identifier sets.
    pub fn classify(&self, previous: &[Value], next: &[Value]) -> Classification {
        let id_field = self.config.id_field.as_str();

        let (prev_index, prev_skipped) = index_records(previous, id_field);
        let (next_index, next_skipped) = index_records(next, id_field);

        let old = Value::Array(previous.iter().map(|r| self.prune(r)).collect());
        let new = Value::Array(next.iter().map(|r| self.prune(r)).collect());

        let mut working = old.clone();
        let mut marked_destroy = HashSet::new();
        let mut marked_create = HashSet::new();
        let mut marked_update = HashSet::new();

        for op in json_patch::diff(&old, &new).0 {
            let tokens = pointer_tokens(&op);
            let Some(slot) = tokens.first().and_then(|t| slot_index(t, &working)) else {
                replay(&mut working, &op);
                continue;
            };
            let whole_record = tokens.len() == 1;
            let touches_identity =
                whole_record || tokens.get(1).is_some_and(|key| key == id_field);

            if touches_identity {
                let before = match &op {
                    PatchOperation::Add(_) if whole_record => None,
                    _ => slot_id(&working, slot, id_field),
                };
                replay(&mut working, &op);
                let after = match &op {
                    PatchOperation::Remove(_) if whole_record => None,
                    _ => slot_id(&working, slot, id_field),
                };

                if before != after {
                    if let Some(id) = before {
                        marked_destroy.insert(id);
                    }
                    if let Some(id) = after {
                        marked_create.insert(id);
                    }
                } else if let Some(id) = after {
                    marked_update.insert(id);
                }
            } else {
                replay(&mut working, &op);
                if let Some(id) = slot_id(&working, slot, id_field) {
                    marked_update.insert(id);
                }
            }
        }

        let moved: HashSet<&ResourceId> = marked_destroy
            .iter()
            .chain(marked_create.iter())
            .filter(|id| prev_index.contains_key(*id) && next_index.contains_key(*id))
            .collect();

        let destroy: Vec<ResourceId> = ordered_ids(previous, id_field)
            .filter(|id| marked_destroy.contains(id) && !next_index.contains_key(id))
            .collect();

        let create: Vec<ResourceId> = ordered_ids(next, id_field)
            .filter(|id| marked_create.contains(id) && !prev_index.contains_key(id))
            .collect();

        let update: Vec<ResourceId> = ordered_ids(next, id_field)
            .filter(|id| prev_index.contains_key(id))
            .filter(|id| {
                if moved.contains(id) {
                    match (prev_index.get(id), next_index.get(id)) {
                        (Some(p), Some(n)) => self.prune(p) != self.prune(n),
                        _ => false,
                    }
                } else {
                    marked_update.contains(id)
                }
            })
            .collect();

        Classification {
            destroy,
            create,
            update,
            unidentified: prev_skipped + next_skipped,
        }
    }

    /// Copy `record` without its nested collection fields.
    fn prune(&self, record: &Value) -> Value {
        match record {
            Value::Object(map) if !self.nested.is_empty() => Value::Object(
                map.iter()
                    .filter(|(k, _)| !self.nested.iter().any(|(field, _)| field == *k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => record.clone(),
        }
    }
}

/// Map identifiers to their first record. Also returns how many records
/// could not be indexed.
fn index_records<'a>(
    records: &'a [Value],
    id_field: &str,
) -> (HashMap<ResourceId, &'a Value>, usize) {
    let mut index = HashMap::with_capacity(records.len());
    let mut skipped = 0;
    for record in records {
        match identify(record, id_field) {
            Some(id) if !index.contains_key(&id) => {
                index.insert(id, record);
            }
            _ => skipped += 1,
        }
    }
    (index, skipped)
}

/// Identifiers in snapshot order, first occurrence only.
fn ordered_ids<'a>(records: &'a [Value], id_field: &'a str) -> impl Iterator<Item = ResourceId> + 'a {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(move |r| identify(r, id_field))
        .filter(move |id| seen.insert(id.clone()))
}

/// Unescaped reference tokens of the operation's JSON pointer.
fn pointer_tokens(op: &PatchOperation) -> Vec<String> {
    let pointer = match op {
        PatchOperation::Add(op) => op.path.to_string(),
        PatchOperation::Remove(op) => op.path.to_string(),
        PatchOperation::Replace(op) => op.path.to_string(),
        PatchOperation::Move(op) => op.path.to_string(),
        PatchOperation::Copy(op) => op.path.to_string(),
        PatchOperation::Test(op) => op.path.to_string(),
    };
    pointer
        .split('/')
        .skip(1)
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Array position named by `token`; `-` is the slot past the end.
fn slot_index(token: &str, working: &Value) -> Option<usize> {
    match token {
        "-" => working.as_array().map(Vec::len),
        _ => token.parse().ok(),
    }
}

fn replay(working: &mut Value, op: &PatchOperation) {
    // A patch produced by `diff(old, _)` always applies to `old` replayed
    // up to this operation.
    let _ = json_patch::patch(working, std::slice::from_ref(op));
}

fn slot_id(working: &Value, slot: usize, id_field: &str) -> Option<ResourceId> {
    working.get(slot).and_then(|record| identify(record, id_field))
}

/// A nested collection, or an empty one if the field is absent.
fn collection<'a>(record: &'a Value, field: &str) -> &'a [Value] {
    match record.get(field) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}
