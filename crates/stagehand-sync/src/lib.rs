//! # Stagehand Sync
//!
//! Keeps one consumer's view of the authoritative state current.
//!
//! ## Overview
//!
//! Each resource type is followed by a [`Source`], which turns the store's
//! snapshots into protocol calls: a create packet for the first snapshot and
//! minimal diffs afterwards. A [`SyncCoordinator`] owns the sources for the
//! bound connection and decides what reaches the consumer, based on its
//! [`Readiness`].
//!
//! ## Key Properties
//!
//! - **No buffering**: calls produced before the consumer is ready are
//!   dropped; the bootstrap reflects the current snapshots instead
//! - **One bootstrap per connection**: a rebind starts over from Loading
//! - **Ordered**: calls for one resource type go out in snapshot order
//!
//! ## Message Flow
//!
//! ```text
//! Engine                               Consumer
//!   |<------- bind --------------------|
//!   |<------- controlsReady -----------|
//!   |-------- create packets --------->|
//!   |-------- onSettingsUpdate ------->|
//!   |-------- onReady ---------------->|
//!   |-------- diffs ... -------------->|
//! ```

pub mod convergence;
pub mod coordinator;
pub mod error;
pub mod messages;
pub mod source;
pub mod transport;

pub use convergence::{verify_convergence, ConsumerModel, ConvergenceResult, SceneState};
pub use coordinator::{Delivery, Readiness, SyncConfig, SyncCoordinator, SyncStats};
pub use error::{Result, SyncError};
pub use messages::{ready_call, ConnectionId, ConsumerEvent, Settings, TransportEvent};
pub use source::Source;
pub use transport::{
    memory::{pair as memory_pair, MemoryConsumer, MemoryTransport, OutboundCall},
    Transport,
};
