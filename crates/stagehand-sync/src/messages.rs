//! Messages exchanged with the consumer outside of resource diffs.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use stagehand_core::protocol::methods;
use stagehand_core::Call;

/// Identity of one consumer connection.
///
/// A reload of the consumer frame produces a new connection, so anything
/// tagged with an older id is stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Generate a random connection ID.
    pub fn random() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen())
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({:016x})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Connection-level settings sent with every bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Language the consumer should render in.
    pub language: String,
    /// Platform the consumer runs on (`web`, `mobile`, `xbox`, ...).
    pub platform: String,
    /// Whether the consumer is responsible for placing the video.
    pub places_video: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            platform: "web".to_string(),
            places_video: false,
        }
    }
}

impl Settings {
    /// The `onSettingsUpdate` call carrying these settings.
    pub fn to_call(&self) -> Call {
        let params = serde_json::to_value(self).unwrap_or(Value::Null);
        Call::new(methods::SETTINGS_UPDATE, params)
    }
}

/// The capability call that closes a bootstrap.
pub fn ready_call() -> Call {
    Call::new(methods::READY, json!({ "isReady": true }))
}

/// An event raised by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A consumer frame attached. Any previous connection is gone.
    Bound { connection: ConnectionId },
    /// The consumer invoked an exposed method.
    Invoked {
        connection: ConnectionId,
        method: String,
        params: Value,
    },
    /// The consumer frame went away.
    Unbound { connection: ConnectionId },
}

impl TransportEvent {
    /// The connection this event belongs to.
    pub fn connection(&self) -> ConnectionId {
        match self {
            TransportEvent::Bound { connection }
            | TransportEvent::Invoked { connection, .. }
            | TransportEvent::Unbound { connection } => *connection,
        }
    }
}

/// A consumer-initiated call surfaced to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerEvent {
    /// Connection the call arrived on.
    pub connection: ConnectionId,
    /// Exposed method that was invoked.
    pub method: String,
    /// Parameters passed by the consumer.
    pub params: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_encode_camel_case() {
        let call = Settings {
            language: "fr".into(),
            platform: "xbox".into(),
            places_video: true,
        }
        .to_call();
        assert_eq!(call.method, "onSettingsUpdate");
        assert_eq!(
            call.params,
            json!({ "language": "fr", "platform": "xbox", "placesVideo": true })
        );
    }

    #[test]
    fn test_ready_call() {
        assert_eq!(ready_call().params, json!({ "isReady": true }));
    }

    #[test]
    fn test_connection_ids_differ() {
        assert_ne!(ConnectionId::random(), ConnectionId::random());
        assert_eq!(ConnectionId(0xab).to_string(), "00000000000000ab");
    }
}
