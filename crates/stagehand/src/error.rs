//! Error types for Stagehand.

use stagehand_core::CoreError;
use stagehand_store::StoreError;
use stagehand_sync::SyncError;
use thiserror::Error;

/// Errors that can occur while running a session.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// Snapshot interpretation error.
    #[error("snapshot error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync or transport error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The session is no longer running.
    #[error("session closed")]
    SessionClosed,
}

/// Result type for Stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;
