//! Unified error handling for the console.

use serde_json::Value;
use tourney_engine::Outcome;

use crate::config::ConfigError;

/// Console error type.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Engine error: {0}")]
    Engine(#[from] tourney_engine::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server rejected request ({status}): {body}")]
    Rejected { status: u16, body: Value },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ConsoleError {
    /// How this error is shown in the transcript.
    pub fn to_outcome(&self) -> Outcome {
        match self {
            ConsoleError::Rejected { status, body } => Outcome::Rejected {
                status: *status,
                body: body.clone(),
            },
            other => Outcome::TransportError {
                message: other.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        ConsoleError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ConsoleError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ConsoleError::Transport(err.to_string())
    }
}

/// Result type alias for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;
