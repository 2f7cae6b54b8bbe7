//! Error types for Stagehand core.

use thiserror::Error;

use crate::types::ResourceKind;

/// Errors raised while interpreting a snapshot.
///
/// The comparator itself never fails; these come from adapters that expect
/// a snapshot of a particular shape.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed {kind} snapshot: {reason}")]
    MalformedSnapshot { kind: ResourceKind, reason: String },
}

impl CoreError {
    pub(crate) fn malformed(kind: ResourceKind, reason: impl Into<String>) -> Self {
        CoreError::MalformedSnapshot {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
