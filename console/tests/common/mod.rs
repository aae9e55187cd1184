//! Fakes shared by the console integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tourney_console::channel::{Connector, Frame, PushSocket};
use tourney_console::{ApiRequest, ConsoleError, Result, Transport};
use tourney_engine::{RoundNumber, Snapshot, Topic};

pub fn round_one() -> Topic {
    Topic::MatchResults {
        round: RoundNumber::new(1).unwrap(),
    }
}

/// A match result row for round one.
pub fn match_row(match_id: i64, goals_1: i64, goals_2: i64) -> Value {
    json!({
        "match_id": match_id,
        "team_1_id": match_id * 10,
        "team_2_id": match_id * 10 + 1,
        "team_1_name": format!("Home{}", match_id),
        "team_2_name": format!("Away{}", match_id),
        "team_1_goals": goals_1,
        "team_2_goals": goals_2,
    })
}

/// A match results document.
pub fn match_results(rows: Vec<Value>) -> Value {
    json!({ "match_results": rows })
}

pub fn snapshot(rows: Vec<Value>) -> Snapshot {
    Snapshot::from_value(round_one(), match_results(rows)).unwrap()
}

/// One connection attempt seen by [`FakeConnector`].
#[derive(Debug)]
pub struct Attempt {
    pub at: Instant,
    /// Feeds the opened socket; `None` when the handshake was refused.
    /// Dropping it closes the socket.
    pub frames: Option<mpsc::UnboundedSender<Frame>>,
}

/// Connector whose sockets are fed by the test.
pub struct FakeConnector {
    attempts: mpsc::UnboundedSender<Attempt>,
    refuse: AtomicUsize,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Attempt>) {
        Self::refusing(0)
    }

    /// Refuse the first `count` handshakes.
    pub fn refusing(count: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<Attempt>) {
        let (attempts, rx) = mpsc::unbounded_channel();
        let connector = Self {
            attempts,
            refuse: AtomicUsize::new(count),
        };
        (Arc::new(connector), rx)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _topic: Topic) -> Result<Box<dyn PushSocket>> {
        let at = Instant::now();
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            let _ = self.attempts.send(Attempt { at, frames: None });
            return Err(ConsoleError::Transport("connection refused".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.attempts.send(Attempt {
            at,
            frames: Some(tx),
        });
        Ok(Box::new(FakeSocket { frames: rx }))
    }
}

struct FakeSocket {
    frames: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl PushSocket for FakeSocket {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        self.frames.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.frames.close();
    }
}

/// Connector whose handshake never finishes.
pub struct StalledConnector;

#[async_trait]
impl Connector for StalledConnector {
    async fn connect(&self, _topic: Topic) -> Result<Box<dyn PushSocket>> {
        std::future::pending().await
    }
}

enum Reply {
    Now(Result<Value>),
    Later(oneshot::Receiver<Result<Value>>),
}

/// Transport answering from a script, recording every request.
///
/// Requests past the end of the script get an empty object.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new(script: Vec<Result<Value>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(Reply::Now).collect()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Queue a reply the test sends later. Dropping the sender leaves the
    /// request hanging.
    pub fn deferred(&self) -> oneshot::Sender<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().push_back(Reply::Later(rx));
        tx
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.sent.lock().unwrap().push(request);
        let reply = self.script.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Now(result)) => result,
            Some(Reply::Later(rx)) => match rx.await {
                Ok(result) => result,
                Err(_) => std::future::pending().await,
            },
            None => Ok(json!({})),
        }
    }
}

pub fn rejected(status: u16, detail: &str) -> Result<Value> {
    Err(ConsoleError::Rejected {
        status,
        body: json!({ "detail": detail }),
    })
}
