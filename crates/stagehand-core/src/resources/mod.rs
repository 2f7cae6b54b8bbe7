//! Per-resource-type adapters.
//!
//! Each adapter knows where its collection lives inside a raw snapshot, how
//! its records are keyed, and which calls bootstrap it from nothing. All of
//! them share the same [`ResourceComparator`](crate::ResourceComparator)
//! machinery.

mod groups;
mod participant;
mod scenes;

pub use groups::{group_comparator, GroupsAdapter};
pub use participant::{participant_comparator, ParticipantAdapter};
pub use scenes::{control_comparator, scene_comparator, ScenesAdapter};

use serde_json::Value;

use crate::call::Call;
use crate::comparator::Comparison;
use crate::error::Result;
use crate::protocol::DEFAULT_REASSIGN_ID;
use crate::types::ResourceKind;

/// Adapter from raw snapshots of one resource type to protocol calls.
pub trait ResourceAdapter: Send + Sync {
    /// The resource type this adapter handles.
    fn kind(&self) -> ResourceKind;

    /// Calls that turn the consumer's view of `previous` into `next`.
    fn diff(&self, previous: &Value, next: &Value) -> Result<Comparison>;

    /// Calls that build the consumer's view of `snapshot` from nothing.
    fn create_packet(&self, snapshot: &Value) -> Result<Vec<Call>>;
}

/// Options shared by the built-in adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Scene that participants of a deleted scene are moved to.
    pub reassign_scene_id: String,
    /// Group that participants of a deleted group are moved to.
    pub reassign_group_id: String,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            reassign_scene_id: DEFAULT_REASSIGN_ID.to_string(),
            reassign_group_id: DEFAULT_REASSIGN_ID.to_string(),
        }
    }
}

/// Build the adapter for `kind`.
pub fn adapter_for(kind: ResourceKind, options: &AdapterOptions) -> Box<dyn ResourceAdapter> {
    match kind {
        ResourceKind::Scenes => Box::new(ScenesAdapter::new(&options.reassign_scene_id)),
        ResourceKind::Groups => Box::new(GroupsAdapter::new(&options.reassign_group_id)),
        ResourceKind::Participant => Box::new(ParticipantAdapter::new()),
    }
}

/// Pull the `field` of a parent record, or `null`.
fn context_field(context: Option<&Value>, field: &str) -> Value {
    context
        .and_then(|record| record.get(field))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Pull the `field` of a record, or `null`.
fn record_field(record: &Value, field: &str) -> Value {
    record.get(field).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_for_each_kind() {
        let options = AdapterOptions::default();
        for kind in ResourceKind::ALL {
            assert_eq!(adapter_for(kind, &options).kind(), kind);
        }
    }
}
