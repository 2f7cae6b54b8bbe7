//! Readiness state machine.
//!
//! One [`SyncCoordinator`] serves one consumer at a time. Binding a
//! connection creates fresh [`Source`]s and puts the coordinator in
//! [`Readiness::Loading`]; the consumer's ready-signal then moves it to
//! [`Readiness::Ready`] (with a bootstrap) or [`Readiness::AwaitingValid`]
//! (until every source has a snapshot).
//!
//! ```text
//!            ready-signal, all snapshots present
//!   Loading ─────────────────────────────────────────> Ready
//!      │                                                 ^
//!      │ ready-signal, some snapshot missing             │ last snapshot arrives
//!      └─────────────────────> AwaitingValid ────────────┘
//!
//!   any state ── rebind ──> Loading
//! ```
//!
//! Calls produced while Loading are dropped, never buffered: the bootstrap
//! always reflects the current snapshots.

use stagehand_core::{AdapterOptions, Call, ResourceKind, Snapshot};

use crate::messages::{ready_call, ConnectionId, Settings};
use crate::source::Source;

/// Readiness of the bound consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Bound, but the consumer has not announced readiness.
    Loading,
    /// The consumer is ready but some source has no snapshot yet.
    AwaitingValid,
    /// Bootstrapped; diffs are forwarded as they arrive.
    Ready,
}

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Settings sent with every bootstrap.
    pub settings: Settings,
    /// Whether a bootstrap ends with `onReady`.
    pub send_ready_call: bool,
    /// Options for the built-in adapters.
    pub adapters: AdapterOptions,
    /// Resource types mirrored into the consumer, in bootstrap order.
    pub kinds: Vec<ResourceKind>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            send_ready_call: true,
            adapters: AdapterOptions::default(),
            kinds: ResourceKind::ALL.to_vec(),
        }
    }
}

/// Calls to send to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// The connection the calls were produced for.
    pub connection: ConnectionId,
    /// Calls, in send order.
    pub calls: Vec<Call>,
    /// Whether this is a full bootstrap rather than an incremental diff.
    pub bootstrap: bool,
}

/// Counters kept across bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Connections bound.
    pub binds: usize,
    /// Bootstraps produced.
    pub bootstraps: usize,
    /// Calls handed out for delivery.
    pub forwarded_calls: usize,
    /// Calls discarded because the consumer was not ready.
    pub dropped_calls: usize,
}

struct Binding {
    connection: ConnectionId,
    readiness: Readiness,
    sources: Vec<Source>,
}

/// Drives sources and readiness for one consumer.
pub struct SyncCoordinator {
    config: SyncConfig,
    binding: Option<Binding>,
    stats: SyncStats,
}

impl SyncCoordinator {
    /// Create an unbound coordinator.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            binding: None,
            stats: SyncStats::default(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// The bound connection, if any.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.binding.as_ref().map(|b| b.connection)
    }

    /// Readiness of the bound connection, if any.
    pub fn readiness(&self) -> Option<Readiness> {
        self.binding.as_ref().map(|b| b.readiness)
    }

    /// The source following `kind` on the bound connection.
    pub fn source(&self, kind: ResourceKind) -> Option<&Source> {
        self.binding
            .as_ref()?
            .sources
            .iter()
            .find(|s| s.kind() == kind)
    }

    /// Bind `connection`, replacing any previous one.
    ///
    /// Sources start over with no snapshot and readiness resets to Loading.
    pub fn bind(&mut self, connection: ConnectionId) {
        if let Some(previous) = &self.binding {
            tracing::info!(
                previous = %previous.connection,
                connection = %connection,
                "rebinding consumer"
            );
        } else {
            tracing::info!(connection = %connection, "binding consumer");
        }

        let sources = self
            .config
            .kinds
            .iter()
            .map(|kind| Source::for_kind(*kind, &self.config.adapters))
            .collect();

        self.binding = Some(Binding {
            connection,
            readiness: Readiness::Loading,
            sources,
        });
        self.stats.binds += 1;
    }

    /// Unbind `connection`, discarding its sources.
    ///
    /// Returns false if `connection` is not the bound one.
    pub fn unbind(&mut self, connection: ConnectionId) -> bool {
        match &self.binding {
            Some(binding) if binding.connection == connection => {
                tracing::info!(connection = %connection, "unbinding consumer");
                self.binding = None;
                true
            }
            _ => {
                tracing::debug!(connection = %connection, "ignoring unbind of stale connection");
                false
            }
        }
    }

    /// Handle the consumer's ready-signal.
    pub fn on_ready_signal(&mut self, connection: ConnectionId) -> Option<Delivery> {
        let binding = self.binding.as_ref()?;
        if binding.connection != connection {
            tracing::warn!(connection = %connection, "ready-signal from stale connection");
            return None;
        }

        match binding.readiness {
            Readiness::Ready => {
                tracing::warn!(connection = %connection, "ready-signal while already ready");
                None
            }
            Readiness::Loading | Readiness::AwaitingValid => self.try_bootstrap(),
        }
    }

    /// Handle a snapshot for `kind` on the bound connection.
    pub fn on_snapshot(&mut self, kind: ResourceKind, snapshot: Snapshot) -> Option<Delivery> {
        let binding = self.binding.as_mut()?;
        let source = binding.sources.iter_mut().find(|s| s.kind() == kind)?;
        let calls = source.observe(snapshot)?;

        match binding.readiness {
            Readiness::Loading => {
                if !calls.is_empty() {
                    tracing::debug!(kind = %kind, calls = calls.len(), "consumer loading, dropping calls");
                }
                self.stats.dropped_calls += calls.len();
                None
            }
            Readiness::AwaitingValid => {
                let delivery = self.try_bootstrap();
                if delivery.is_none() {
                    self.stats.dropped_calls += calls.len();
                }
                delivery
            }
            Readiness::Ready => {
                if calls.is_empty() {
                    return None;
                }
                tracing::debug!(kind = %kind, calls = calls.len(), "forwarding diff");
                self.stats.forwarded_calls += calls.len();
                Some(Delivery {
                    connection: binding.connection,
                    calls,
                    bootstrap: false,
                })
            }
        }
    }

    /// Replace the connection-level settings.
    ///
    /// A ready consumer is sent the new settings at once; otherwise they go
    /// out with the next bootstrap.
    pub fn update_settings(&mut self, settings: Settings) -> Option<Delivery> {
        let call = settings.to_call();
        self.config.settings = settings;
        self.forward(call)
    }

    /// Forward a connection-level call if the consumer is ready.
    pub fn forward(&mut self, call: Call) -> Option<Delivery> {
        let binding = self.binding.as_ref()?;
        if binding.readiness != Readiness::Ready {
            self.stats.dropped_calls += 1;
            return None;
        }
        self.stats.forwarded_calls += 1;
        Some(Delivery {
            connection: binding.connection,
            calls: vec![call],
            bootstrap: false,
        })
    }

    fn try_bootstrap(&mut self) -> Option<Delivery> {
        let binding = self.binding.as_mut()?;

        let mut calls = Vec::new();
        for source in &binding.sources {
            match source.create_packet() {
                Some(packet) => calls.extend(packet),
                None => {
                    if binding.readiness != Readiness::AwaitingValid {
                        tracing::debug!(
                            connection = %binding.connection,
                            missing = %source.kind(),
                            "consumer ready, awaiting snapshots"
                        );
                        binding.readiness = Readiness::AwaitingValid;
                    }
                    return None;
                }
            }
        }

        calls.push(self.config.settings.to_call());
        if self.config.send_ready_call {
            calls.push(ready_call());
        }

        binding.readiness = Readiness::Ready;
        self.stats.bootstraps += 1;
        self.stats.forwarded_calls += calls.len();
        tracing::info!(
            connection = %binding.connection,
            calls = calls.len(),
            "bootstrapping consumer"
        );

        Some(Delivery {
            connection: binding.connection,
            calls,
            bootstrap: true,
        })
    }
}
