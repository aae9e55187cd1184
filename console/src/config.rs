//! Configuration management for the console.

use std::env;
use std::time::Duration;

use tourney_engine::{GroupNumber, RoundNumber, Topic};

/// Console configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP base URL of the tournament server
    pub api_url: String,
    /// Base URL for push subscriptions
    pub ws_url: String,
    /// Fixed delay between a dropped push connection and the next attempt
    pub reconnect_delay: Duration,
    /// How long an optimistic edit may wait for a confirming snapshot
    pub pending_edit_timeout: Duration,
    /// How long a view waits for its initial table fetch
    pub fetch_timeout: Duration,
    /// Maximum transcript entries
    pub transcript_capacity: usize,
    /// Round used for match result batches
    pub round: RoundNumber,
    /// Table the binary mounts
    pub topic: Topic,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("API_URL").unwrap_or_else(|| "http://localhost:8000".to_string());
        let ws_url = lookup("WS_URL").unwrap_or_else(|| "ws://localhost:8000/ws".to_string());

        let reconnect_delay = Duration::from_secs(number(&lookup, "RECONNECT_DELAY_SECS", 5)?);
        let pending_edit_timeout =
            Duration::from_secs(number(&lookup, "PENDING_EDIT_TIMEOUT_SECS", 15)?);
        let fetch_timeout = Duration::from_secs(number(&lookup, "FETCH_TIMEOUT_SECS", 10)?);
        let transcript_capacity = number(&lookup, "TRANSCRIPT_CAPACITY", 200)? as usize;

        let round = RoundNumber::new(number(&lookup, "ROUND_NUMBER", 1)? as i64)
            .map_err(|e| ConfigError::OutOfRange(e.to_string()))?;
        let group = GroupNumber::new(number(&lookup, "CONSOLE_GROUP", 1)? as i64)
            .map_err(|e| ConfigError::OutOfRange(e.to_string()))?;

        let topic = match lookup("CONSOLE_TOPIC").as_deref().unwrap_or("match_results") {
            "match_results" => Topic::MatchResults { round },
            "teams" => Topic::Teams,
            "rankings" => Topic::Rankings { round, group },
            other => return Err(ConfigError::UnknownTopic(other.to_string())),
        };

        Ok(Self {
            api_url,
            ws_url,
            reconnect_delay,
            pending_edit_timeout,
            fetch_timeout,
            transcript_capacity,
            round,
            topic,
        })
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {name} value: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0}")]
    OutOfRange(String),

    #[error("Unknown CONSOLE_TOPIC {0:?}, expected match_results, teams or rankings")]
    UnknownTopic(String),
}
