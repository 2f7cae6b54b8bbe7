//! Strong type definitions for Stagehand.
//!
//! Identifiers are newtypes so a scene ID can never be mixed up with a raw
//! field value at an API boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of one record within a resource collection.
///
/// Records carry their identifier in a declared field (`sceneID`,
/// `controlID`, ...). String and numeric identifiers are both accepted;
/// numbers are kept in their JSON text form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Extract an identifier from a JSON value.
    ///
    /// Returns `None` for anything that is not a string or a number.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Read the identifier of `record` from its `id_field`.
///
/// Non-object records and records whose field is missing or not scalar are
/// unidentifiable.
pub fn identify(record: &Value, id_field: &str) -> Option<ResourceId> {
    record.get(id_field).and_then(ResourceId::from_value)
}

/// The resource types mirrored into a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// The world: scenes, their controls, and top-level world fields.
    Scenes,
    /// Participant groups.
    Groups,
    /// The participant the consumer is rendered for.
    Participant,
}

impl ResourceKind {
    /// Every kind, in bootstrap order.
    ///
    /// Scenes come first because groups reference scenes, and groups come
    /// before the participant because the participant references a group.
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Scenes,
        ResourceKind::Groups,
        ResourceKind::Participant,
    ];

    /// Lowercase name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Scenes => "scenes",
            ResourceKind::Groups => "groups",
            ResourceKind::Participant => "participant",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identify_string_and_number() {
        assert_eq!(
            identify(&json!({ "sceneID": "lobby" }), "sceneID"),
            Some(ResourceId::new("lobby"))
        );
        assert_eq!(
            identify(&json!({ "groupID": 7 }), "groupID"),
            Some(ResourceId::new("7"))
        );
    }

    #[test]
    fn test_identify_rejects_non_scalar() {
        assert_eq!(identify(&json!({ "sceneID": null }), "sceneID"), None);
        assert_eq!(identify(&json!({ "sceneID": ["a"] }), "sceneID"), None);
        assert_eq!(identify(&json!({}), "sceneID"), None);
        assert_eq!(identify(&json!("lobby"), "sceneID"), None);
    }

    #[test]
    fn test_resource_id_display() {
        let id = ResourceId::new("c1");
        assert_eq!(format!("{}", id), "c1");
        assert_eq!(format!("{:?}", id), "ResourceId(c1)");
    }

    #[test]
    fn test_kind_order_is_bootstrap_order() {
        let mut kinds = ResourceKind::ALL.to_vec();
        kinds.sort();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
        assert_eq!(ResourceKind::Participant.to_string(), "participant");
    }
}
