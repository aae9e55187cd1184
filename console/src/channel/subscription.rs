//! The live channel: one worker task per topic.
//!
//! The worker drives [`ChannelMachine`] against a [`Connector`]. It publishes
//! the connection state and the latest snapshot through `watch` channels and
//! forwards every state change and decoded snapshot, in order, to the
//! [`LiveChannel`] handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tourney_engine::{Snapshot, Topic};
use uuid::Uuid;

use super::connector::{Connector, Frame, PushSocket};
use super::state::{ChannelEvent, ChannelMachine, ConnectionState, Effect};

/// Ordered notifications from a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelUpdate {
    State(ConnectionState),
    Snapshot(Snapshot),
}

/// Handle to a subscribed topic. Dropping it stops the worker.
#[derive(Debug)]
pub struct LiveChannel {
    topic: Topic,
    state_rx: watch::Receiver<ConnectionState>,
    snapshot_rx: watch::Receiver<Option<Snapshot>>,
    updates_rx: mpsc::UnboundedReceiver<ChannelUpdate>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl LiveChannel {
    /// Subscribe to a topic.
    ///
    /// `buffered` is the snapshot fetched before subscribing; it is re-emitted
    /// each time the connection opens until a pushed snapshot replaces it.
    pub fn subscribe(
        topic: Topic,
        connector: Arc<dyn Connector>,
        buffered: Option<Snapshot>,
        reconnect_delay: Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (snapshot_tx, snapshot_rx) = watch::channel(buffered);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = Worker {
            topic,
            connector,
            machine: ChannelMachine::new(reconnect_delay),
            state_tx,
            snapshot_tx,
            updates_tx,
            shutdown_rx,
        };
        let task = tokio::spawn(worker.run());

        Self {
            topic,
            state_rx,
            snapshot_rx,
            updates_rx,
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Whether the push connection is currently open.
    pub fn is_live(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// The most recent snapshot, pushed or buffered.
    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Next update, or `None` once the worker has stopped.
    pub async fn next_update(&mut self) -> Option<ChannelUpdate> {
        self.updates_rx.recv().await
    }

    /// Stop the channel: close the socket, cancel any pending reconnect and
    /// wait for the worker to finish.
    pub async fn teardown(mut self) {
        if let Some(shutdown) = self.shutdown_tx.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                tracing::error!(topic = %self.topic, "Channel worker failed: {}", e);
            }
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Worker {
    topic: Topic,
    connector: Arc<dyn Connector>,
    machine: ChannelMachine,
    state_tx: watch::Sender<ConnectionState>,
    snapshot_tx: watch::Sender<Option<Snapshot>>,
    updates_tx: mpsc::UnboundedSender<ChannelUpdate>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl Worker {
    async fn run(mut self) {
        let mut effect = self.transition(ChannelEvent::Subscribe);

        loop {
            effect = match effect {
                Effect::Connect => self.connect().await,
                Effect::ScheduleReconnect(delay) => {
                    tracing::info!(
                        topic = %self.topic,
                        delay_secs = delay.as_secs(),
                        "Push channel backing off"
                    );
                    tokio::select! {
                        _ = &mut self.shutdown_rx => self.transition(ChannelEvent::Teardown),
                        _ = tokio::time::sleep(delay) => self.transition(ChannelEvent::BackoffElapsed),
                    }
                }
                Effect::Close | Effect::Idle => break,
            };
        }

        tracing::info!(topic = %self.topic, "Push channel stopped");
    }

    /// Apply an event and publish the new state. An invalid transition stops
    /// the worker.
    fn transition(&mut self, event: ChannelEvent) -> Effect {
        let before = self.machine.state();
        let effect = match self.machine.handle(event) {
            Ok(effect) => effect,
            Err(e) => {
                tracing::error!(topic = %self.topic, "{}", e);
                return Effect::Idle;
            }
        };

        let after = self.machine.state();
        if after != before {
            self.state_tx.send_replace(after);
            let _ = self.updates_tx.send(ChannelUpdate::State(after));
        }
        effect
    }

    async fn connect(&mut self) -> Effect {
        let conn_id = Uuid::new_v4();
        tracing::info!(
            topic = %self.topic,
            conn_id = %conn_id,
            attempt = self.machine.attempts(),
            "Connecting push channel"
        );

        let connected = tokio::select! {
            _ = &mut self.shutdown_rx => return self.transition(ChannelEvent::Teardown),
            result = self.connector.connect(self.topic) => result,
        };

        match connected {
            Ok(socket) => {
                let effect = self.transition(ChannelEvent::HandshakeSucceeded);
                if self.machine.state() != ConnectionState::Open {
                    return effect;
                }
                tracing::info!(topic = %self.topic, conn_id = %conn_id, "Push channel open");

                let buffered = self.snapshot_tx.borrow().clone();
                if let Some(snapshot) = buffered {
                    let _ = self.updates_tx.send(ChannelUpdate::Snapshot(snapshot));
                }
                self.pump(socket, conn_id).await
            }
            Err(e) => {
                tracing::warn!(topic = %self.topic, conn_id = %conn_id, "Push handshake failed: {}", e);
                self.transition(ChannelEvent::HandshakeFailed)
            }
        }
    }

    /// Read frames until the connection ends or the channel is torn down.
    async fn pump(&mut self, mut socket: Box<dyn PushSocket>, conn_id: Uuid) -> Effect {
        loop {
            let frame = tokio::select! {
                _ = &mut self.shutdown_rx => {
                    let effect = self.transition(ChannelEvent::Teardown);
                    socket.close().await;
                    return effect;
                }
                frame = socket.next_frame() => frame,
            };

            match frame {
                Some(Ok(Frame::Text(text))) => match Snapshot::decode(self.topic, &text) {
                    Ok(snapshot) => {
                        tracing::debug!(
                            topic = %self.topic,
                            conn_id = %conn_id,
                            rows = snapshot.len(),
                            "Snapshot received"
                        );
                        self.snapshot_tx.send_replace(Some(snapshot.clone()));
                        let _ = self.updates_tx.send(ChannelUpdate::Snapshot(snapshot));
                    }
                    Err(e) => {
                        tracing::warn!(
                            topic = %self.topic,
                            conn_id = %conn_id,
                            "Dropping undecodable frame: {}",
                            e
                        );
                    }
                },
                Some(Ok(Frame::Other)) => {
                    tracing::trace!(conn_id = %conn_id, "Ignoring non-text frame");
                }
                Some(Ok(Frame::Close)) | None => {
                    tracing::info!(topic = %self.topic, conn_id = %conn_id, "Push channel closed");
                    return self.transition(ChannelEvent::Closed);
                }
                Some(Err(e)) => {
                    tracing::warn!(topic = %self.topic, conn_id = %conn_id, "Push channel error: {}", e);
                    return self.transition(ChannelEvent::TransportError);
                }
            }
        }
    }
}
