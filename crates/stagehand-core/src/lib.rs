//! # Stagehand Core
//!
//! Pure primitives for mirroring authoritative resource state into an
//! untrusted consumer: identifiers, protocol calls and the resource
//! comparator.
//!
//! This crate contains no I/O and no clocks. Every function is
//! referentially transparent.
//!
//! ## Key Types
//!
//! - [`ResourceComparator`] - minimal create/update/destroy calls between
//!   two snapshots of an identifier-keyed collection
//! - [`ComparatorConfig`] - identifier field, call builders and nested
//!   collections for one resource type
//! - [`Call`] - one outbound protocol call
//! - [`Snapshot`] - an immutable full-state value with a content fingerprint
//! - [`ResourceAdapter`] - turns raw snapshots of one resource type into
//!   diffs and bootstrap packets
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use stagehand_core::resources::scene_comparator;
//! use stagehand_core::ResourceComparator;
//!
//! let comparator = ResourceComparator::new(scene_comparator("default"));
//! let calls = comparator.compare(&[], &[json!({ "sceneID": "s1", "controls": [] })], None);
//! assert_eq!(calls[0].method, "onSceneCreate");
//! ```

pub mod call;
pub mod comparator;
pub mod error;
pub mod protocol;
pub mod resources;
pub mod snapshot;
pub mod types;

pub use call::{Call, IntoCalls};
pub use comparator::{Classification, ComparatorConfig, Comparison, ResourceComparator};
pub use error::{CoreError, Result};
pub use resources::{adapter_for, AdapterOptions, ResourceAdapter};
pub use snapshot::{Fingerprint, Snapshot};
pub use types::{identify, ResourceId, ResourceKind};
