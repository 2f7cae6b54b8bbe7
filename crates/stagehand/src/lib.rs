//! # Stagehand
//!
//! Mirrors authoritative resource state (scenes and their controls, groups,
//! the participant) into an untrusted consumer frame, using the smallest
//! possible stream of create/update/delete calls.
//!
//! ## Overview
//!
//! - **Resources**: identifier-keyed records in typed collections
//! - **Snapshots**: immutable full-state values published by the store
//! - **Diffs**: minimal calls between consecutive snapshots
//! - **Readiness**: the consumer announces when it can take calls; until
//!   then nothing is sent, and once it is ready it gets one bootstrap built
//!   from the current snapshots
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use stagehand::store::MemoryStore;
//! use stagehand::sync::memory_pair;
//! use stagehand::{ResourceKind, Session, StagehandConfig};
//!
//! async fn example() -> stagehand::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     store.publish(ResourceKind::Scenes, json!({ "scenes": [] }));
//!     store.publish(ResourceKind::Groups, json!([]));
//!     store.publish(ResourceKind::Participant, json!(null));
//!
//!     let (transport, _consumer) = memory_pair();
//!     let mut session = Session::new(store, transport, StagehandConfig::default())?;
//!     let report = session.run().await?;
//!     println!("{} bootstraps", report.bootstraps);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `stagehand::core` - identifiers, calls, the comparator and
//!   resource adapters
//! - `stagehand::store` - the snapshot store contract
//! - `stagehand::sync` - sources, readiness and the transport contract

pub mod config;
pub mod error;
pub mod session;

// Re-export component crates
pub use stagehand_core as core;
pub use stagehand_store as store;
pub use stagehand_sync as sync;

// Re-export main types for convenience
pub use config::StagehandConfig;
pub use error::{Result, StagehandError};
pub use session::{Session, SessionHandle, SessionReport};

// Re-export commonly used types
pub use stagehand_core::{Call, ComparatorConfig, ResourceComparator, ResourceId, ResourceKind, Snapshot};
pub use stagehand_sync::{ConnectionId, ConsumerEvent, Readiness, Settings, Transport};
