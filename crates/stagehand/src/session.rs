//! The session: one coordinator bound to one store and one transport.
//!
//! A [`Session`] runs a single event loop. Transport events, snapshots and
//! host commands are handled one at a time, to completion, in arrival order.
//! Snapshot subscriptions live on small forwarding tasks that are started on
//! bind and aborted on unbind; everything they forward is tagged with the
//! connection it was read for, so nothing reaches a newer connection by
//! accident.

use std::sync::Arc;

use serde_json::Value;
use stagehand_core::{ResourceKind, Snapshot};
use stagehand_store::SnapshotStore;
use stagehand_sync::{
    ConnectionId, ConsumerEvent, Delivery, Readiness, Settings, SyncCoordinator, SyncError,
    Transport, TransportEvent,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::StagehandConfig;
use crate::error::{Result, StagehandError};

const CHANNEL_CAPACITY: usize = 1000;

/// Result of a session run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Connections bound.
    pub binds: usize,
    /// Bootstraps delivered.
    pub bootstraps: usize,
    /// Calls delivered to the consumer.
    pub delivered_calls: usize,
    /// Calls discarded because the consumer was not ready or had gone.
    pub dropped_calls: usize,
    /// Consumer-initiated calls surfaced to the host.
    pub consumer_events: usize,
}

struct SnapshotUpdate {
    connection: ConnectionId,
    kind: ResourceKind,
    snapshot: Snapshot,
}

enum Command {
    UpdateSettings(Settings),
    Shutdown,
}

/// Cloneable handle for steering a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Replace the connection-level settings.
    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        self.send(Command::UpdateSettings(settings)).await
    }

    /// Stop the session after the event in progress.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| StagehandError::SessionClosed)
    }
}

/// Mirrors the store into whichever consumer the transport is bound to.
pub struct Session<S: SnapshotStore, T: Transport> {
    store: Arc<S>,
    transport: T,
    config: StagehandConfig,
    coordinator: SyncCoordinator,
    snapshots_tx: mpsc::Sender<SnapshotUpdate>,
    snapshots_rx: mpsc::Receiver<SnapshotUpdate>,
    commands_tx: mpsc::Sender<Command>,
    commands_rx: mpsc::Receiver<Command>,
    events_tx: Option<mpsc::Sender<ConsumerEvent>>,
    watchers: Vec<JoinHandle<()>>,
    delivered_calls: usize,
    stale_calls: usize,
    consumer_events: usize,
}

impl<S: SnapshotStore, T: Transport> Session<S, T> {
    /// Create a session. Nothing happens until [`run`](Self::run).
    pub fn new(store: Arc<S>, transport: T, config: StagehandConfig) -> Result<Self> {
        config.validate()?;

        let (snapshots_tx, snapshots_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (commands_tx, commands_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let coordinator = SyncCoordinator::new(config.sync_config());

        Ok(Self {
            store,
            transport,
            config,
            coordinator,
            snapshots_tx,
            snapshots_rx,
            commands_tx,
            commands_rx,
            events_tx: None,
            watchers: Vec::new(),
            delivered_calls: 0,
            stale_calls: 0,
            consumer_events: 0,
        })
    }

    /// A handle for steering the session while it runs.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            commands: self.commands_tx.clone(),
        }
    }

    /// Receive consumer-initiated calls to exposed methods.
    ///
    /// Replaces any previous receiver. Without one, such calls are logged
    /// and discarded. A receiver that falls more than the channel capacity
    /// behind loses events rather than stalling the session.
    pub fn consumer_events(&mut self) -> mpsc::Receiver<ConsumerEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.events_tx = Some(tx);
        rx
    }

    pub fn config(&self) -> &StagehandConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The bound connection, if any.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.coordinator.connection()
    }

    /// Readiness of the bound connection, if any.
    pub fn readiness(&self) -> Option<Readiness> {
        self.coordinator.readiness()
    }

    /// Counters so far.
    pub fn report(&self) -> SessionReport {
        let stats = self.coordinator.stats();
        SessionReport {
            binds: stats.binds,
            bootstraps: stats.bootstraps,
            delivered_calls: self.delivered_calls,
            dropped_calls: stats.dropped_calls + self.stale_calls,
            consumer_events: self.consumer_events,
        }
    }

    /// Run until shut down or until the transport closes.
    ///
    /// Transport delivery failures end the run with an error; they are
    /// never retried here.
    pub async fn run(&mut self) -> Result<SessionReport> {
        self.transport.expose(&self.config.ready_method).await?;
        for method in &self.config.exposed_methods {
            self.transport.expose(method).await?;
        }

        let result = self.event_loop().await;
        self.stop_watchers();
        result?;

        let report = self.report();
        tracing::info!(
            bootstraps = report.bootstraps,
            delivered = report.delivered_calls,
            dropped = report.dropped_calls,
            "session finished"
        );
        Ok(report)
    }

    async fn event_loop(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                event = self.transport.recv() => match event {
                    Ok(event) => self.on_transport_event(event).await?,
                    Err(SyncError::TransportClosed) => {
                        tracing::info!("transport closed");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                },
                Some(update) = self.snapshots_rx.recv() => self.on_snapshot(update).await?,
                Some(command) = self.commands_rx.recv() => match command {
                    Command::UpdateSettings(settings) => self.update_settings(settings).await?,
                    Command::Shutdown => return Ok(()),
                },
            }
        }
    }

    /// Replace the connection-level settings.
    ///
    /// A ready consumer gets `onSettingsUpdate` at once; otherwise the
    /// settings go out with the next bootstrap.
    pub async fn update_settings(&mut self, settings: Settings) -> Result<()> {
        self.config.settings = settings.clone();
        match self.coordinator.update_settings(settings) {
            Some(delivery) => self.deliver(delivery).await,
            None => Ok(()),
        }
    }

    async fn on_transport_event(&mut self, event: TransportEvent) -> Result<()> {
        match event {
            TransportEvent::Bound { connection } => self.bind(connection),
            TransportEvent::Unbound { connection } => {
                if self.coordinator.unbind(connection) {
                    self.stop_watchers();
                }
                Ok(())
            }
            TransportEvent::Invoked {
                connection,
                method,
                params,
            } => self.on_invoked(connection, method, params).await,
        }
    }

    async fn on_invoked(&mut self, connection: ConnectionId, method: String, params: Value) -> Result<()> {
        if method == self.config.ready_method {
            return match self.coordinator.on_ready_signal(connection) {
                Some(delivery) => self.deliver(delivery).await,
                None => Ok(()),
            };
        }

        if !self.config.exposed_methods.contains(&method) {
            tracing::debug!(method = %method, "ignoring unexposed method");
            return Ok(());
        }
        if self.coordinator.connection() != Some(connection) {
            tracing::debug!(connection = %connection, method = %method, "ignoring call from stale connection");
            return Ok(());
        }

        let event = ConsumerEvent {
            connection,
            method,
            params,
        };
        let Some(tx) = &self.events_tx else {
            tracing::debug!(method = %event.method, "no listener for consumer events");
            return Ok(());
        };
        match tx.try_send(event) {
            Ok(()) => self.consumer_events += 1,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(method = %event.method, "consumer event listener lagging, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("consumer event listener gone");
                self.events_tx = None;
            }
        }
        Ok(())
    }

    async fn on_snapshot(&mut self, update: SnapshotUpdate) -> Result<()> {
        if self.coordinator.connection() != Some(update.connection) {
            return Ok(());
        }
        match self.coordinator.on_snapshot(update.kind, update.snapshot) {
            Some(delivery) => self.deliver(delivery).await,
            None => Ok(()),
        }
    }

    fn bind(&mut self, connection: ConnectionId) -> Result<()> {
        self.stop_watchers();
        self.coordinator.bind(connection);

        for kind in self.config.kinds.clone() {
            let mut subscription = self.store.subscribe(kind)?;
            let tx = self.snapshots_tx.clone();
            self.watchers.push(tokio::spawn(async move {
                loop {
                    let snapshot = match subscription.next().await {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            tracing::debug!(kind = %kind, error = %e, "snapshot subscription ended");
                            return;
                        }
                    };
                    let update = SnapshotUpdate {
                        connection,
                        kind,
                        snapshot,
                    };
                    if tx.send(update).await.is_err() {
                        return;
                    }
                }
            }));
        }
        Ok(())
    }

    async fn deliver(&mut self, delivery: Delivery) -> Result<()> {
        if self.coordinator.connection() != Some(delivery.connection) {
            tracing::debug!(connection = %delivery.connection, "dropping delivery for unbound connection");
            self.stale_calls += delivery.calls.len();
            return Ok(());
        }
        for call in delivery.calls {
            self.transport.send(call).await?;
            self.delivered_calls += 1;
        }
        Ok(())
    }

    fn stop_watchers(&mut self) {
        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
    }
}

impl<S: SnapshotStore, T: Transport> Drop for Session<S, T> {
    fn drop(&mut self) {
        self.stop_watchers();
    }
}
