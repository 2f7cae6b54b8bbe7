//! The participant a consumer is rendered for.
//!
//! A single record rather than a collection; it is diffed as a collection of
//! at most one participant keyed by `sessionID`.

use serde_json::{json, Value};

use super::{record_field, ResourceAdapter};
use crate::call::Call;
use crate::comparator::{ComparatorConfig, Comparison, ResourceComparator};
use crate::error::{CoreError, Result};
use crate::protocol::{fields, methods};
use crate::types::ResourceKind;

/// Comparator configuration for the participant.
pub fn participant_comparator() -> ComparatorConfig {
    ComparatorConfig::new(fields::SESSION_ID)
        .on_create(|records: &[Value], _: Option<&Value>| {
            Call::new(methods::PARTICIPANT_JOIN, json!({ "participants": records }))
        })
        .on_update(|records: &[Value], _: Option<&Value>| {
            Call::new(methods::PARTICIPANT_UPDATE, json!({ "participants": records }))
        })
        .on_destroy(|records: &[Value], _: Option<&Value>| {
            let participants: Vec<Value> = records
                .iter()
                .map(|r| json!({ "sessionID": record_field(r, fields::SESSION_ID) }))
                .collect();
            Call::new(
                methods::PARTICIPANT_LEAVE,
                json!({ "participants": participants }),
            )
        })
}

#[derive(Debug, Clone)]
pub struct ParticipantAdapter {
    comparator: ResourceComparator,
}

impl ParticipantAdapter {
    pub fn new() -> Self {
        Self {
            comparator: ResourceComparator::new(participant_comparator()),
        }
    }

    fn as_collection(&self, snapshot: &Value) -> Result<Vec<Value>> {
        match snapshot {
            Value::Null => Ok(Vec::new()),
            Value::Object(_) => Ok(vec![snapshot.clone()]),
            _ => Err(CoreError::malformed(
                ResourceKind::Participant,
                "participant is neither an object nor null",
            )),
        }
    }
}

impl Default for ParticipantAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceAdapter for ParticipantAdapter {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Participant
    }

    fn diff(&self, previous: &Value, next: &Value) -> Result<Comparison> {
        let previous = self.as_collection(previous)?;
        let next = self.as_collection(next)?;
        Ok(self.comparator.diff(&previous, &next, None))
    }

    fn create_packet(&self, snapshot: &Value) -> Result<Vec<Call>> {
        Ok(self.comparator.compare(&[], &self.as_collection(snapshot)?, None))
    }
}
