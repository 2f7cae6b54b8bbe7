//! Immutable snapshots of one resource type.
//!
//! The store hands out whole values, never deltas. A [`Snapshot`] is a cheap
//! shared handle to one such value; it is never mutated after creation.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// An immutable full-state value for one resource type at one instant.
#[derive(Clone)]
pub struct Snapshot(Arc<Value>);

impl Snapshot {
    /// Wrap a value.
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the underlying value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Content fingerprint of this snapshot.
    ///
    /// `serde_json` keeps object keys sorted, so equal values always encode
    /// to the same bytes.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"stagehand-snapshot-v0:");
        hasher.update(&serde_json::to_vec(self.value()).unwrap_or_default());
        Fingerprint(*hasher.finalize().as_bytes())
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({})", self.fingerprint())
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// A 32-byte Blake3 digest of a snapshot's canonical JSON encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_values_are_equal_snapshots() {
        let a = Snapshot::new(json!({ "scenes": [], "b": 1, "a": 2 }));
        let b = Snapshot::new(json!({ "a": 2, "b": 1, "scenes": [] }));
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_different_values_differ() {
        let a = Snapshot::new(json!([{ "groupID": "default" }]));
        let b = Snapshot::new(json!([{ "groupID": "red" }]));
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_display_is_short_hex() {
        let display = Snapshot::new(json!(null)).fingerprint().to_string();
        assert_eq!(display.len(), 16);
        assert!(display.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
