//! Error types for the store module.

use stagehand_core::ResourceKind;
use thiserror::Error;

/// Errors that can occur while reading from a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store side of a subscription was dropped.
    #[error("store closed while subscribed to {0}")]
    Closed(ResourceKind),

    /// The store does not carry this resource type.
    #[error("resource type not available: {0}")]
    Unavailable(ResourceKind),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
