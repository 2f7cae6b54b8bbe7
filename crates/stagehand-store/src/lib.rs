//! # Stagehand Store
//!
//! The contract Stagehand consumes from the authoritative state store, plus
//! an in-memory implementation.
//!
//! ## Overview
//!
//! A store exposes, per resource type, a subscribable sequence of immutable
//! snapshot values. New subscribers see the current value immediately and
//! every later distinct value afterwards. Values are whole snapshots, never
//! deltas.
//!
//! ## Implementations
//!
//! - [`MemoryStore`] - `tokio::sync::watch` channels, one per resource type

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{PublishResult, SnapshotStore, Subscription};
