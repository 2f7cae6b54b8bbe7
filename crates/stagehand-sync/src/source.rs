//! Sources: one resource type's stream of snapshots turned into calls.
//!
//! A [`Source`] owns the last snapshot it has seen for its type. The first
//! snapshot yields a create packet; every later distinct snapshot yields the
//! diff against its predecessor. Nothing else ever writes that baseline.

use stagehand_core::{adapter_for, AdapterOptions, Call, ResourceAdapter, ResourceKind, Snapshot};
use stagehand_store::Subscription;

use crate::error::Result;

/// Turns snapshots of one resource type into protocol calls.
pub struct Source {
    adapter: Box<dyn ResourceAdapter>,
    last: Option<Snapshot>,
}

impl Source {
    /// Create a source around `adapter`.
    pub fn new(adapter: Box<dyn ResourceAdapter>) -> Self {
        Self {
            adapter,
            last: None,
        }
    }

    /// Create a source with the built-in adapter for `kind`.
    pub fn for_kind(kind: ResourceKind, options: &AdapterOptions) -> Self {
        Self::new(adapter_for(kind, options))
    }

    /// The resource type this source follows.
    pub fn kind(&self) -> ResourceKind {
        self.adapter.kind()
    }

    /// Whether a usable snapshot has been observed.
    pub fn has_snapshot(&self) -> bool {
        self.last.is_some()
    }

    /// The last usable snapshot observed.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    /// Feed the next snapshot.
    ///
    /// Returns `None` when `snapshot` equals the previous one. Otherwise
    /// returns the calls it produced, possibly none: a create packet for the
    /// first snapshot, a diff for every later one.
    ///
    /// A snapshot that cannot be interpreted produces no calls and does not
    /// replace the baseline, so the next good snapshot is diffed against the
    /// last good one.
    pub fn observe(&mut self, snapshot: Snapshot) -> Option<Vec<Call>> {
        if self.last.as_ref() == Some(&snapshot) {
            return None;
        }

        let kind = self.kind();
        let produced = match &self.last {
            None => self.adapter.create_packet(snapshot.value()),
            Some(previous) => self
                .adapter
                .diff(previous.value(), snapshot.value())
                .map(|comparison| {
                    if comparison.unidentified > 0 {
                        tracing::warn!(
                            kind = %kind,
                            records = comparison.unidentified,
                            "skipped records without a usable identifier"
                        );
                    }
                    comparison.calls
                }),
        };

        match produced {
            Ok(calls) => {
                tracing::debug!(
                    kind = %kind,
                    fingerprint = %snapshot.fingerprint(),
                    calls = calls.len(),
                    "snapshot observed"
                );
                self.last = Some(snapshot);
                Some(calls)
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "ignoring malformed snapshot");
                Some(Vec::new())
            }
        }
    }

    /// A fresh bootstrap packet for the last usable snapshot.
    ///
    /// `None` until a snapshot has been observed.
    pub fn create_packet(&self) -> Option<Vec<Call>> {
        let snapshot = self.last.as_ref()?;
        match self.adapter.create_packet(snapshot.value()) {
            Ok(calls) => Some(calls),
            Err(e) => {
                tracing::warn!(kind = %self.kind(), error = %e, "cannot rebuild create packet");
                None
            }
        }
    }

    /// Wait for the next distinct snapshot on `subscription` and return its
    /// calls.
    pub async fn next_event(&mut self, subscription: &mut Subscription) -> Result<Vec<Call>> {
        loop {
            let snapshot = subscription.next().await?;
            if let Some(calls) = self.observe(snapshot) {
                return Ok(calls);
            }
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("kind", &self.kind())
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stagehand_store::{MemoryStore, SnapshotStore};

    fn groups_source() -> Source {
        Source::for_kind(ResourceKind::Groups, &AdapterOptions::default())
    }

    fn methods(calls: &[Call]) -> Vec<&str> {
        calls.iter().map(|c| c.method.as_str()).collect()
    }

    #[test]
    fn test_first_snapshot_yields_create_packet() {
        let mut source = groups_source();
        assert!(!source.has_snapshot());
        assert!(source.create_packet().is_none());

        let calls = source
            .observe(json!([{ "groupID": "default" }]).into())
            .unwrap();
        assert_eq!(methods(&calls), vec!["onGroupCreate"]);
        assert!(source.has_snapshot());
    }

    #[test]
    fn test_equal_snapshot_is_not_an_event() {
        let mut source = groups_source();
        source.observe(json!([{ "groupID": "a" }]).into());
        assert!(source.observe(json!([{ "groupID": "a" }]).into()).is_none());
    }

    #[test]
    fn test_later_snapshots_are_diffed() {
        let mut source = groups_source();
        source.observe(json!([{ "groupID": "a" }]).into());

        let calls = source
            .observe(json!([{ "groupID": "a" }, { "groupID": "b" }]).into())
            .unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "onGroupCreate");
        assert_eq!(calls[0].params, json!({ "groups": [{ "groupID": "b" }] }));
    }

    #[test]
    fn test_create_packet_reflects_latest_snapshot() {
        let mut source = groups_source();
        source.observe(json!([{ "groupID": "a" }]).into());
        source.observe(json!([{ "groupID": "b" }]).into());

        let packet = source.create_packet().unwrap();
        assert_eq!(packet[0].params, json!({ "groups": [{ "groupID": "b" }] }));
    }

    #[test]
    fn test_malformed_snapshot_keeps_baseline() {
        let mut source = groups_source();
        source.observe(json!([{ "groupID": "a" }]).into());

        let calls = source.observe(json!("not groups").into()).unwrap();
        assert!(calls.is_empty());
        assert_eq!(
            source.last_snapshot().unwrap().value(),
            &json!([{ "groupID": "a" }])
        );

        let calls = source.observe(json!([]).into()).unwrap();
        assert_eq!(methods(&calls), vec!["onGroupDelete"]);
    }

    #[test]
    fn test_malformed_first_snapshot_leaves_source_empty() {
        let mut source = Source::for_kind(ResourceKind::Scenes, &AdapterOptions::default());
        let calls = source.observe(json!({ "scenes": 4 }).into()).unwrap();
        assert!(calls.is_empty());
        assert!(!source.has_snapshot());
    }

    #[tokio::test]
    async fn test_next_event_skips_repeats() {
        let store = MemoryStore::with_snapshots([(ResourceKind::Groups, json!([]))]);
        let mut subscription = store.subscribe(ResourceKind::Groups).unwrap();
        let mut source = groups_source();

        let bootstrap = source.next_event(&mut subscription).await.unwrap();
        assert!(bootstrap.is_empty());

        store.publish(ResourceKind::Groups, json!([{ "groupID": "red" }]));
        let calls = source.next_event(&mut subscription).await.unwrap();
        assert_eq!(methods(&calls), vec!["onGroupCreate"]);
    }
}
