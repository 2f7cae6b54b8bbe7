//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur while syncing a consumer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The transport has no more events to deliver.
    #[error("transport closed")]
    TransportClosed,

    /// A reply-awaited call got no reply.
    #[error("no reply to {0}")]
    NoReply(String),

    /// Message validation failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    StoreError(#[from] stagehand_store::StoreError),

    /// A snapshot could not be interpreted.
    #[error("snapshot error: {0}")]
    SnapshotError(#[from] stagehand_core::CoreError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
