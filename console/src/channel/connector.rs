//! Push socket abstraction and its WebSocket implementation.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tourney_engine::Topic;

use crate::error::Result;

/// An inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete snapshot document
    Text(String),
    Close,
    /// Pings, pongs and binary frames
    Other,
}

/// One open push connection.
#[async_trait]
pub trait PushSocket: Send {
    /// Next inbound frame; `None` once the stream has ended.
    async fn next_frame(&mut self) -> Option<Result<Frame>>;

    async fn close(&mut self);
}

/// Opens push connections for topics.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, topic: Topic) -> Result<Box<dyn PushSocket>>;
}

/// [`Connector`] over WebSocket.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Push URL for a topic, e.g. `ws://host/ws/rankings/1/2`.
    pub fn url_for(&self, topic: Topic) -> String {
        format!("{}/{}", self.base_url, topic.path())
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, topic: Topic) -> Result<Box<dyn PushSocket>> {
        let url = self.url_for(topic);
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(Box::new(WsSocket { stream }))
    }
}

struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl PushSocket for WsSocket {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        let frame = match self.stream.next().await? {
            Ok(Message::Text(text)) => Ok(Frame::Text(text.as_str().to_owned())),
            Ok(Message::Close(_)) => Ok(Frame::Close),
            Ok(_) => Ok(Frame::Other),
            Err(e) => Err(e.into()),
        };
        Some(frame)
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("Error while closing push socket: {}", e);
        }
    }
}
