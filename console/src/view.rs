//! A mounted live table.
//!
//! The view owns a [`Reconciler`] fed by a [`LiveChannel`]. Cell edits are
//! applied optimistically and their update requests run as spawned tasks
//! that report back over a channel; [`TableView::step`] resolves whatever
//! happens next. Dropping or unmounting the view discards late results.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tourney_engine::{
    sorted_view, Action, EditId, EditTicket, Outcome, Reconciler, Resolution, Rollback, Row,
    RowKey, Snapshot, SortDirection, Timestamp, Topic, Transcript,
};

use crate::api::{self, Api};
use crate::channel::{ChannelUpdate, ConnectionState, Connector, LiveChannel};
use crate::config::Config;
use crate::error::Result;
use crate::session::{require, Role, Session};
use crate::transport::{ApiRequest, Transport};

/// Timing knobs for a view.
#[derive(Debug, Clone, Copy)]
pub struct ViewConfig {
    pub reconnect_delay: Duration,
    pub pending_edit_timeout: Duration,
    /// Bound on the initial fetch; the subscription starts after it
    pub fetch_timeout: Duration,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            pending_edit_timeout: Duration::from_secs(15),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for ViewConfig {
    fn from(config: &Config) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay,
            pending_edit_timeout: config.pending_edit_timeout,
            fetch_timeout: config.fetch_timeout,
        }
    }
}

/// Something that changed the rendered table or its status.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// A snapshot replaced the table
    Refreshed {
        rows: usize,
        superseded: Vec<EditId>,
    },
    Connection(ConnectionState),
    /// The server accepted an update; the value stays until a snapshot
    /// confirms it
    EditAccepted(EditId),
    RolledBack(Rollback),
    /// The server rejected an edit that was already replaced or superseded
    StaleRejection(EditId),
    TimedOut(Vec<Rollback>),
    RowDeleteResolved { row_key: RowKey, success: bool },
}

#[derive(Debug)]
enum RequestKind {
    CellUpdate {
        edit_id: EditId,
        row_key: RowKey,
        field: String,
    },
    RowDelete {
        row_key: RowKey,
    },
}

#[derive(Debug)]
struct RequestOutcome {
    kind: RequestKind,
    body: Value,
    result: Result<Value>,
}

/// Milliseconds since the Unix epoch, for transcript entries.
pub(crate) fn wall_clock_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis().max(0) as Timestamp
}

/// A live, editable table for one topic.
pub struct TableView {
    topic: Topic,
    api: Api,
    session: Arc<dyn Session>,
    reconciler: Reconciler,
    channel: LiveChannel,
    outcomes_tx: mpsc::UnboundedSender<RequestOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<RequestOutcome>,
    pending_edit_timeout: Duration,
    epoch: Instant,
}

impl TableView {
    /// Fetch the topic's table and subscribe to its pushes.
    ///
    /// A failed or timed out fetch is logged and the view starts empty; the
    /// first pushed snapshot fills it.
    pub async fn mount(
        topic: Topic,
        api: Api,
        connector: Arc<dyn Connector>,
        session: Arc<dyn Session>,
        config: ViewConfig,
    ) -> Self {
        let fetched = tokio::time::timeout(config.fetch_timeout, api.fetch_snapshot(topic)).await;
        let buffered = match fetched {
            Ok(Ok(snapshot)) => Some(snapshot),
            Ok(Err(e)) => {
                tracing::warn!(topic = %topic, "Initial fetch failed: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    topic = %topic,
                    timeout = ?config.fetch_timeout,
                    "Initial fetch timed out"
                );
                None
            }
        };

        let reconciler = match &buffered {
            Some(snapshot) => Reconciler::with_snapshot(snapshot.clone()),
            None => Reconciler::new(topic),
        };
        let channel = LiveChannel::subscribe(topic, connector, buffered, config.reconnect_delay);
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        tracing::info!(topic = %topic, rows = reconciler.snapshot().len(), "View mounted");

        Self {
            topic,
            api,
            session,
            reconciler,
            channel,
            outcomes_tx,
            outcomes_rx,
            pending_edit_timeout: config.pending_edit_timeout,
            epoch: Instant::now(),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Rows as displayed, in server order.
    pub fn rows(&self) -> Vec<Row> {
        self.reconciler.rows()
    }

    /// Rows as displayed, sorted by one column.
    pub fn sorted_rows(&self, column: &str, direction: SortDirection) -> Vec<Row> {
        let rows = self.reconciler.rows();
        sorted_view(&rows, column, direction)
            .into_iter()
            .cloned()
            .collect()
    }

    /// A displayed cell value.
    pub fn value(&self, row_key: RowKey, field: &str) -> Option<Value> {
        self.reconciler.value(row_key, field)
    }

    pub fn pending_edits(&self) -> usize {
        self.reconciler.pending().count()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn is_live(&self) -> bool {
        self.channel.is_live()
    }

    fn now(&self) -> Timestamp {
        self.epoch.elapsed().as_millis() as Timestamp
    }

    fn timeout_ms(&self) -> u64 {
        self.pending_edit_timeout.as_millis() as u64
    }

    /// Edit one cell from raw input.
    ///
    /// The value is validated against the column's rule and shown at once;
    /// the update request runs in the background and is resolved by
    /// [`TableView::step`].
    pub fn edit_cell(&mut self, row_key: RowKey, field: &str, input: &str) -> Result<EditTicket> {
        require(self.session.as_ref(), Role::Admin)?;

        let value = self.reconciler.coerce(field, input)?;
        let ticket = self
            .reconciler
            .apply_local_edit(row_key, field, value, self.now())?;

        let request = match api::update_request(self.topic, &ticket) {
            Ok(request) => request,
            Err(e) => {
                self.reconciler.reject(ticket.edit_id);
                return Err(e);
            }
        };

        tracing::debug!(
            topic = %self.topic,
            edit_id = ticket.edit_id,
            row_key,
            field,
            "Cell edit applied optimistically"
        );

        self.spawn_request(
            request,
            RequestKind::CellUpdate {
                edit_id: ticket.edit_id,
                row_key,
                field: field.to_string(),
            },
        );
        Ok(ticket)
    }

    /// Delete a row. The row stays until a snapshot omits it.
    pub fn delete_row(&mut self, row_key: RowKey) -> Result<()> {
        require(self.session.as_ref(), Role::Admin)?;
        if self.reconciler.snapshot().row(row_key).is_none() {
            return Err(tourney_engine::Error::RowNotFound(row_key).into());
        }

        let request = api::delete_request(self.topic, row_key)?;
        tracing::debug!(topic = %self.topic, row_key, "Deleting row");
        self.spawn_request(request, RequestKind::RowDelete { row_key });
        Ok(())
    }

    fn spawn_request(&self, request: ApiRequest, kind: RequestKind) {
        let transport = self.api.transport();
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let body = request.transcript_body();
            let result = transport.send(request).await;
            // the view may be gone; its result is discarded then
            let _ = outcomes.send(RequestOutcome { kind, body, result });
        });
    }

    /// Wait for the next thing that changes the view and apply it.
    ///
    /// Returns `None` once the channel has stopped.
    pub async fn step(&mut self, transcript: &mut Transcript) -> Option<ViewEvent> {
        loop {
            let deadline = self
                .reconciler
                .next_deadline(self.timeout_ms())
                .map(|ms| self.epoch + Duration::from_millis(ms));

            tokio::select! {
                update = self.channel.next_update() => match update? {
                    ChannelUpdate::State(state) => return Some(ViewEvent::Connection(state)),
                    ChannelUpdate::Snapshot(snapshot) => {
                        if let Some(event) = self.apply_snapshot(snapshot) {
                            return Some(event);
                        }
                    }
                },
                Some(outcome) = self.outcomes_rx.recv() => {
                    return Some(self.resolve(outcome, transcript));
                }
                _ = sleep_until(deadline) => {
                    let expired = self.reconciler.expire(self.now(), self.timeout_ms());
                    if !expired.is_empty() {
                        return Some(self.record_timeouts(expired, transcript));
                    }
                }
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) -> Option<ViewEvent> {
        match self.reconciler.apply_snapshot(snapshot) {
            Ok(applied) => {
                if !applied.superseded.is_empty() {
                    tracing::debug!(
                        topic = %self.topic,
                        superseded = ?applied.superseded,
                        "Snapshot superseded pending edits"
                    );
                }
                Some(ViewEvent::Refreshed {
                    rows: applied.rows.len(),
                    superseded: applied.superseded,
                })
            }
            Err(e) => {
                tracing::warn!(topic = %self.topic, "Ignoring snapshot: {}", e);
                None
            }
        }
    }

    fn resolve(&mut self, outcome: RequestOutcome, transcript: &mut Transcript) -> ViewEvent {
        let RequestOutcome { kind, body, result } = outcome;
        let logged = match &result {
            Ok(_) => Outcome::Success,
            Err(e) => e.to_outcome(),
        };

        match kind {
            RequestKind::CellUpdate {
                edit_id,
                row_key,
                field,
            } => {
                transcript.append(
                    wall_clock_ms(),
                    Action::CellUpdate { row_key, field },
                    body,
                    logged,
                );
                match result {
                    Ok(_) => {
                        self.reconciler.acknowledge(edit_id);
                        ViewEvent::EditAccepted(edit_id)
                    }
                    Err(e) => {
                        tracing::warn!(topic = %self.topic, edit_id, "Cell update failed: {}", e);
                        match self.reconciler.reject(edit_id) {
                            Resolution::RolledBack(rollback) => ViewEvent::RolledBack(rollback),
                            Resolution::Stale => ViewEvent::StaleRejection(edit_id),
                        }
                    }
                }
            }
            RequestKind::RowDelete { row_key } => {
                let success = logged.is_success();
                transcript.append(wall_clock_ms(), Action::RowDelete { row_key }, body, logged);
                ViewEvent::RowDeleteResolved { row_key, success }
            }
        }
    }

    fn record_timeouts(&mut self, expired: Vec<Rollback>, transcript: &mut Transcript) -> ViewEvent {
        for rollback in &expired {
            tracing::warn!(
                topic = %self.topic,
                edit_id = rollback.edit_id,
                row_key = rollback.row_key,
                field = %rollback.field,
                "Pending edit timed out"
            );
            transcript.append(
                wall_clock_ms(),
                Action::EditTimeout {
                    row_key: rollback.row_key,
                    field: rollback.field.clone(),
                },
                rollback.restored_value.clone(),
                Outcome::TimedOut,
            );
        }
        ViewEvent::TimedOut(expired)
    }

    /// Tear down the channel. Requests still in flight are not cancelled but
    /// their results are discarded.
    pub async fn unmount(self) {
        let topic = self.topic;
        self.channel.teardown().await;
        tracing::info!(topic = %topic, "View unmounted");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl std::fmt::Debug for TableView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableView")
            .field("topic", &self.topic)
            .field("state", &self.channel.state())
            .field("pending_edits", &self.pending_edits())
            .finish_non_exhaustive()
    }
}
