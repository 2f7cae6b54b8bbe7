//! Transport abstraction between the engine and its consumer.
//!
//! The transport carries one-way or reply-awaited calls out to the consumer,
//! lets the engine expose methods the consumer may invoke, and reports
//! connection lifecycle changes. Reconnection and timeouts belong to the
//! implementation, not to the engine.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use stagehand_core::Call;

use crate::error::Result;
use crate::messages::TransportEvent;

/// Transport trait for talking to one consumer frame.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Register `method` as invokable by the consumer.
    ///
    /// Invocations of methods that were never exposed are not reported.
    async fn expose(&self, method: &str) -> Result<()>;

    /// Invoke `method` on the consumer.
    ///
    /// Returns the consumer's reply when `await_reply` is set, `None`
    /// otherwise.
    async fn call(&self, method: &str, params: Value, await_reply: bool) -> Result<Option<Value>>;

    /// Receive the next lifecycle or invocation event.
    ///
    /// Blocks until an event is available or the transport is closed.
    async fn recv(&self) -> Result<TransportEvent>;

    /// Receive with timeout.
    ///
    /// Returns None if timeout expires before an event arrives.
    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<TransportEvent>> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(event) => event.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Send `call` one-way.
    async fn send(&self, call: Call) -> Result<()> {
        self.call(&call.method, call.params, false).await.map(|_| ())
    }
}

/// A simple in-memory transport for testing.
///
/// [`pair`](memory::pair) returns the engine side and a [`MemoryConsumer`](memory::MemoryConsumer)
/// that plays the consumer frame.
pub mod memory {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{PoisonError, RwLock as SyncRwLock};

    use serde_json::json;
    use stagehand_core::protocol::methods;
    use tokio::sync::{mpsc, oneshot, RwLock};

    use crate::error::SyncError;
    use crate::messages::ConnectionId;

    const CHANNEL_CAPACITY: usize = 1000;

    /// A call as seen by the consumer.
    #[derive(Debug)]
    pub struct OutboundCall {
        /// Connection the engine believed it was talking to.
        pub connection: Option<ConnectionId>,
        /// The call itself.
        pub call: Call,
        reply: Option<oneshot::Sender<Value>>,
    }

    impl OutboundCall {
        /// Whether the engine is waiting for a reply.
        pub fn expects_reply(&self) -> bool {
            self.reply.is_some()
        }

        /// Answer a reply-awaited call. Returns false if no reply was expected
        /// or the engine stopped waiting.
        pub fn reply(mut self, value: Value) -> bool {
            match self.reply.take() {
                Some(tx) => tx.send(value).is_ok(),
                None => false,
            }
        }
    }

    /// Create a connected engine/consumer pair.
    pub fn pair() -> (MemoryTransport, MemoryConsumer) {
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (call_tx, call_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let transport = MemoryTransport {
            events: RwLock::new(event_rx),
            calls: call_tx,
            exposed: SyncRwLock::new(HashSet::new()),
            connection: SyncRwLock::new(None),
        };
        let consumer = MemoryConsumer {
            events: event_tx,
            calls: call_rx,
            connection: None,
        };
        (transport, consumer)
    }

    /// Engine side of the in-memory transport.
    ///
    /// Bookkeeping sits behind synchronous locks that are never held across
    /// an await, so an event taken off the channel is never lost when `recv`
    /// is cancelled.
    pub struct MemoryTransport {
        events: RwLock<mpsc::Receiver<TransportEvent>>,
        calls: mpsc::Sender<OutboundCall>,
        exposed: SyncRwLock<HashSet<String>>,
        connection: SyncRwLock<Option<ConnectionId>>,
    }

    impl MemoryTransport {
        fn current_connection(&self) -> Option<ConnectionId> {
            *self.connection.read().unwrap_or_else(PoisonError::into_inner)
        }

        fn is_exposed(&self, method: &str) -> bool {
            self.exposed
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(method)
        }

        fn track(&self, event: &TransportEvent) {
            let mut current = self.connection.write().unwrap_or_else(PoisonError::into_inner);
            match event {
                TransportEvent::Bound { connection } => *current = Some(*connection),
                TransportEvent::Unbound { connection } if *current == Some(*connection) => {
                    *current = None
                }
                _ => {}
            }
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn expose(&self, method: &str) -> Result<()> {
            self.exposed
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(method.to_string());
            Ok(())
        }

        async fn call(&self, method: &str, params: Value, await_reply: bool) -> Result<Option<Value>> {
            let connection = self.current_connection();
            if connection.is_none() {
                return Err(SyncError::TransportError("no consumer bound".into()));
            }

            let (reply, waiter) = if await_reply {
                let (tx, rx) = oneshot::channel();
                (Some(tx), Some(rx))
            } else {
                (None, None)
            };

            let outbound = OutboundCall {
                connection,
                call: Call::new(method, params),
                reply,
            };
            self.calls
                .send(outbound)
                .await
                .map_err(|_| SyncError::TransportError("consumer disconnected".into()))?;

            match waiter {
                Some(rx) => rx
                    .await
                    .map(Some)
                    .map_err(|_| SyncError::NoReply(method.to_string())),
                None => Ok(None),
            }
        }

        async fn recv(&self) -> Result<TransportEvent> {
            let mut rx = self.events.write().await;
            loop {
                let event = rx.recv().await.ok_or(SyncError::TransportClosed)?;
                if let TransportEvent::Invoked { method, .. } = &event {
                    if !self.is_exposed(method) {
                        tracing::debug!(method = %method, "ignoring call to unexposed method");
                        continue;
                    }
                }
                self.track(&event);
                return Ok(event);
            }
        }
    }

    /// Consumer side of the in-memory transport: a simulated frame.
    pub struct MemoryConsumer {
        events: mpsc::Sender<TransportEvent>,
        calls: mpsc::Receiver<OutboundCall>,
        connection: Option<ConnectionId>,
    }

    impl MemoryConsumer {
        /// The current connection, if attached.
        pub fn connection(&self) -> Option<ConnectionId> {
            self.connection
        }

        /// Attach a fresh frame.
        pub async fn connect(&mut self) -> Result<ConnectionId> {
            let connection = ConnectionId::random();
            self.emit(TransportEvent::Bound { connection }).await?;
            self.connection = Some(connection);
            Ok(connection)
        }

        /// Detach the current frame, if any.
        pub async fn disconnect(&mut self) -> Result<()> {
            if let Some(connection) = self.connection.take() {
                self.emit(TransportEvent::Unbound { connection }).await?;
            }
            Ok(())
        }

        /// Detach and attach again, as a page reload does.
        pub async fn reload(&mut self) -> Result<ConnectionId> {
            self.disconnect().await?;
            self.connect().await
        }

        /// Invoke an exposed method on the engine.
        pub async fn invoke(&self, method: &str, params: Value) -> Result<()> {
            let connection = self
                .connection
                .ok_or_else(|| SyncError::TransportError("consumer not connected".into()))?;
            self.emit(TransportEvent::Invoked {
                connection,
                method: method.to_string(),
                params,
            })
            .await
        }

        /// Announce readiness with the default ready-signal.
        pub async fn ready(&self) -> Result<()> {
            self.invoke(methods::CONTROLS_READY, json!({})).await
        }

        /// Next call addressed to the current connection.
        ///
        /// Calls the engine sent to an older connection are discarded, as a
        /// reloaded frame would never see them. Returns None once the engine
        /// side is dropped.
        pub async fn next_call(&mut self) -> Option<OutboundCall> {
            loop {
                let outbound = self.calls.recv().await?;
                if outbound.connection == self.connection {
                    return Some(outbound);
                }
            }
        }

        /// Next call, giving up after `timeout`.
        pub async fn next_call_timeout(&mut self, timeout: Duration) -> Option<OutboundCall> {
            tokio::time::timeout(timeout, self.next_call())
                .await
                .ok()
                .flatten()
        }

        /// Every call already queued for the current connection.
        pub fn drain(&mut self) -> Vec<Call> {
            let mut calls = Vec::new();
            while let Ok(outbound) = self.calls.try_recv() {
                if outbound.connection == self.connection {
                    calls.push(outbound.call);
                }
            }
            calls
        }

        async fn emit(&self, event: TransportEvent) -> Result<()> {
            self.events
                .send(event)
                .await
                .map_err(|_| SyncError::TransportError("engine disconnected".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::pair;
    use super::*;
    use crate::error::SyncError;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_transport_lifecycle_events() {
        let (transport, mut consumer) = pair();

        let connection = consumer.connect().await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap(),
            TransportEvent::Bound { connection }
        );

        consumer.disconnect().await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap(),
            TransportEvent::Unbound { connection }
        );
    }

    #[tokio::test]
    async fn test_unexposed_methods_are_not_reported() {
        let (transport, mut consumer) = pair();
        transport.expose("controlsReady").await.unwrap();

        let connection = consumer.connect().await.unwrap();
        consumer.invoke("moveVideo", json!({})).await.unwrap();
        consumer.ready().await.unwrap();

        transport.recv().await.unwrap();
        let event = transport.recv().await.unwrap();
        assert_eq!(
            event,
            TransportEvent::Invoked {
                connection,
                method: "controlsReady".into(),
                params: json!({}),
            }
        );
    }

    #[tokio::test]
    async fn test_one_way_call_reaches_consumer() {
        let (transport, mut consumer) = pair();
        consumer.connect().await.unwrap();
        transport.recv().await.unwrap();

        let reply = transport
            .call("onReady", json!({ "isReady": true }), false)
            .await
            .unwrap();
        assert!(reply.is_none());

        let outbound = consumer.next_call().await.unwrap();
        assert_eq!(outbound.call.method, "onReady");
        assert!(!outbound.expects_reply());
    }

    #[tokio::test]
    async fn test_reply_awaited_call() {
        let (transport, mut consumer) = pair();
        consumer.connect().await.unwrap();
        transport.recv().await.unwrap();

        let responder = tokio::spawn(async move {
            let outbound = consumer.next_call().await.unwrap();
            assert!(outbound.expects_reply());
            outbound.reply(json!({ "ok": true }));
        });

        let reply = transport.call("ping", json!({}), true).await.unwrap();
        assert_eq!(reply, Some(json!({ "ok": true })));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_without_consumer_fails() {
        let (transport, _consumer) = pair();
        let result = transport.call("onReady", json!({}), false).await;
        assert!(matches!(result, Err(SyncError::TransportError(_))));
    }

    #[tokio::test]
    async fn test_reloaded_consumer_skips_stale_calls() {
        let (transport, mut consumer) = pair();
        consumer.connect().await.unwrap();
        transport.recv().await.unwrap();
        transport.send(Call::new("old", json!({}))).await.unwrap();

        consumer.reload().await.unwrap();
        transport.recv().await.unwrap();
        transport.recv().await.unwrap();
        transport.send(Call::new("new", json!({}))).await.unwrap();

        let outbound = consumer.next_call().await.unwrap();
        assert_eq!(outbound.call.method, "new");
    }

    #[tokio::test]
    async fn test_closed_transport() {
        let (transport, consumer) = pair();
        drop(consumer);
        assert!(matches!(transport.recv().await, Err(SyncError::TransportClosed)));
        let timed = transport
            .recv_timeout(Duration::from_millis(5))
            .await;
        assert!(matches!(timed, Err(SyncError::TransportClosed)));
    }
}
