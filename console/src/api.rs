//! Endpoint mapping for the tournament server.
//!
//! Request builders are plain functions so they can be checked without a
//! transport; [`Api`] sends them.

use std::sync::Arc;

use serde_json::{json, Value};
use tourney_engine::{BatchContext, BatchPayload, EditTicket, RowKey, Snapshot, Topic};

use crate::error::{ConsoleError, Result};
use crate::transport::{ApiRequest, HttpTransport, Transport};

/// Initial fetch for a topic's table.
pub fn snapshot_request(topic: Topic) -> ApiRequest {
    match topic {
        Topic::Rankings { round, group } => {
            ApiRequest::get(format!("/match_rankings?round={}&group={}", round, group))
        }
        Topic::MatchResults { round } => ApiRequest::get(format!("/match_results?round={}", round)),
        Topic::Teams => ApiRequest::get("/teams"),
    }
}

/// One batch creation request.
pub fn submit_request(payload: &BatchPayload) -> ApiRequest {
    let path = match payload.context() {
        BatchContext::Registration => "/teams",
        BatchContext::Round(_) => "/match_results",
    };
    ApiRequest::post(path, payload.to_body())
}

/// Update request for an optimistic cell edit.
pub fn update_request(topic: Topic, ticket: &EditTicket) -> Result<ApiRequest> {
    match topic {
        Topic::MatchResults { round } => {
            let team_column = match ticket.field.as_str() {
                "team_1_goals" => "team_1_id",
                "team_2_goals" => "team_2_id",
                other => {
                    return Err(tourney_engine::Error::NotEditable(other.to_string()).into());
                }
            };
            let team_id = ticket
                .row
                .get(team_column)
                .and_then(Value::as_i64)
                .ok_or_else(|| {
                    ConsoleError::Decode(format!("row {} has no '{}'", ticket.row_key, team_column))
                })?;
            Ok(ApiRequest::put(
                "/match_results",
                json!({
                    "round_number": round.get(),
                    "match_id": ticket.row_key,
                    "team_id": team_id,
                    "team_goals": ticket.value,
                }),
            ))
        }
        Topic::Teams => {
            let column = |name: &str| ticket.row.get(name).cloned().unwrap_or(Value::Null);
            Ok(ApiRequest::put(
                format!("/teams/{}", ticket.row_key),
                json!({
                    "team_name": column("team_name"),
                    "registration_date_ddmm": column("registration_date_ddmm"),
                }),
            ))
        }
        Topic::Rankings { .. } => Err(tourney_engine::Error::NotEditable(ticket.field.clone()).into()),
    }
}

/// Delete request for one row.
pub fn delete_request(topic: Topic, row_key: RowKey) -> Result<ApiRequest> {
    match topic {
        Topic::MatchResults { round } => Ok(ApiRequest::delete(format!(
            "/match_results/{}?round={}",
            row_key, round
        ))),
        Topic::Teams => Ok(ApiRequest::delete(format!("/teams/{}", row_key))),
        Topic::Rankings { .. } => Err(ConsoleError::Unsupported(
            "ranking rows cannot be deleted".into(),
        )),
    }
}

/// Typed access to the server.
#[derive(Clone)]
pub struct Api {
    transport: Arc<dyn Transport>,
}

impl Api {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Api over HTTP at `base_url`.
    pub fn http(base_url: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpTransport::new(base_url)))
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.transport.send(request).await
    }

    /// Fetch the current table for a topic.
    pub async fn fetch_snapshot(&self, topic: Topic) -> Result<Snapshot> {
        let body = self.send(snapshot_request(topic)).await?;
        Ok(Snapshot::from_value(topic, body)?)
    }

    /// Submit one batch.
    pub async fn submit(&self, payload: &BatchPayload) -> Result<Value> {
        self.send(submit_request(payload)).await
    }
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api").finish_non_exhaustive()
    }
}
