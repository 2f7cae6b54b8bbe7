//! Participant groups.

use serde_json::{json, Value};

use super::{record_field, ResourceAdapter};
use crate::call::Call;
use crate::comparator::{ComparatorConfig, Comparison, ResourceComparator};
use crate::error::{CoreError, Result};
use crate::protocol::{fields, methods};
use crate::types::ResourceKind;

/// Comparator configuration for groups.
pub fn group_comparator(reassign_to: impl Into<String>) -> ComparatorConfig {
    let reassign_to: String = reassign_to.into();
    ComparatorConfig::new(fields::GROUP_ID)
        .on_create(|records: &[Value], _: Option<&Value>| {
            Call::new(methods::GROUP_CREATE, json!({ "groups": records }))
        })
        .on_update(|records: &[Value], _: Option<&Value>| {
            Call::new(methods::GROUP_UPDATE, json!({ "groups": records }))
        })
        .on_destroy(move |records: &[Value], _: Option<&Value>| {
            records
                .iter()
                .map(|r| {
                    Call::new(
                        methods::GROUP_DELETE,
                        json!({
                            "groupID": record_field(r, fields::GROUP_ID),
                            "reassignGroupID": reassign_to,
                        }),
                    )
                })
                .collect::<Vec<_>>()
        })
}

/// Adapter for the groups snapshot: a plain array of groups.
#[derive(Debug, Clone)]
pub struct GroupsAdapter {
    comparator: ResourceComparator,
}

impl GroupsAdapter {
    pub fn new(reassign_group_id: &str) -> Self {
        Self {
            comparator: ResourceComparator::new(group_comparator(reassign_group_id)),
        }
    }

    fn groups<'a>(&self, snapshot: &'a Value) -> Result<&'a [Value]> {
        match snapshot {
            Value::Null => Ok(&[][..]),
            Value::Array(groups) => Ok(groups.as_slice()),
            _ => Err(CoreError::malformed(
                ResourceKind::Groups,
                "groups snapshot is not an array",
            )),
        }
    }
}

impl ResourceAdapter for GroupsAdapter {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Groups
    }

    fn diff(&self, previous: &Value, next: &Value) -> Result<Comparison> {
        Ok(self
            .comparator
            .diff(self.groups(previous)?, self.groups(next)?, None))
    }

    fn create_packet(&self, snapshot: &Value) -> Result<Vec<Call>> {
        Ok(self.comparator.compare(&[], self.groups(snapshot)?, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_lifecycle() {
        let adapter = GroupsAdapter::new("default");
        let v1 = json!([{ "groupID": "default" }]);
        let v2 = json!([{ "groupID": "default", "sceneID": "bonus" }, { "groupID": "red" }]);
        let v3 = json!([{ "groupID": "default", "sceneID": "bonus" }]);

        let packet = adapter.create_packet(&v1).unwrap();
        assert_eq!(
            packet,
            vec![Call::new(methods::GROUP_CREATE, json!({ "groups": [{ "groupID": "default" }] }))]
        );

        let calls = adapter.diff(&v1, &v2).unwrap().calls;
        let seen: Vec<&str> = calls.iter().map(|c| c.method.as_str()).collect();
        assert_eq!(seen, vec![methods::GROUP_CREATE, methods::GROUP_UPDATE]);

        let calls = adapter.diff(&v2, &v3).unwrap().calls;
        assert_eq!(
            calls,
            vec![Call::new(
                methods::GROUP_DELETE,
                json!({ "groupID": "red", "reassignGroupID": "default" })
            )]
        );
    }

    #[test]
    fn test_null_snapshot_is_empty() {
        let adapter = GroupsAdapter::new("default");
        assert!(adapter.create_packet(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_object_snapshot_is_malformed() {
        let adapter = GroupsAdapter::new("default");
        assert!(adapter.create_packet(&json!({ "groupID": "x" })).is_err());
    }
}
