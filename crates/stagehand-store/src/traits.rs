//! Store trait: the abstract interface Stagehand reads snapshots through.

use stagehand_core::{ResourceKind, Snapshot};
use tokio::sync::watch;

use crate::error::{Result, StoreError};

/// Result of publishing a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishResult {
    /// The value replaced the previous one and subscribers were notified.
    Published,
    /// The value equals the current one; nobody was notified.
    Unchanged,
}

/// Read side of an authoritative state store.
///
/// # Design Notes
///
/// - **Current value first**: a fresh [`Subscription`] yields the current
///   snapshot (if any) without waiting.
/// - **No deltas**: every value is a complete snapshot of its type.
/// - **Ordering**: values of one type arrive in publish order. Nothing is
///   promised across types.
pub trait SnapshotStore: Send + Sync {
    /// Subscribe to snapshots of `kind`.
    fn subscribe(&self, kind: ResourceKind) -> Result<Subscription>;

    /// The latest snapshot of `kind`, if one has been published.
    fn current(&self, kind: ResourceKind) -> Option<Snapshot>;
}

/// A live subscription to one resource type.
#[derive(Debug)]
pub struct Subscription {
    kind: ResourceKind,
    receiver: watch::Receiver<Option<Snapshot>>,
    primed: bool,
}

impl Subscription {
    /// Wrap a watch receiver. The receiver's current value is delivered by
    /// the first call to [`next`](Self::next).
    pub fn new(kind: ResourceKind, receiver: watch::Receiver<Option<Snapshot>>) -> Self {
        Self {
            kind,
            receiver,
            primed: false,
        }
    }

    /// The resource type this subscription follows.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Wait for the next snapshot.
    ///
    /// The first call returns the current value immediately when there is
    /// one. Intermediate values published while the caller was busy are
    /// skipped; only the latest is returned.
    pub async fn next(&mut self) -> Result<Snapshot> {
        loop {
            if self.primed {
                self.receiver
                    .changed()
                    .await
                    .map_err(|_| StoreError::Closed(self.kind))?;
            }
            self.primed = true;

            if let Some(snapshot) = self.receiver.borrow_and_update().clone() {
                return Ok(snapshot);
            }
        }
    }
}
