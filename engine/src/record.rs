//! Candidate records produced from valid input lines.
//!
//! A record only exists once its line has the exact arity and every field has
//! passed its rules. The wire representation follows the server's batch
//! request bodies.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The kinds of records an input buffer can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// `<team_name> <registration_date> <group_number>`
    TeamRegistration,
    /// `<team_one> <team_two> <goals_one> <goals_two>`
    MatchResult,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::TeamRegistration => write!(f, "team registration"),
            RecordKind::MatchResult => write!(f, "match result"),
        }
    }
}

/// A single coerced field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Integer(n) => Value::from(n),
            FieldValue::Text(s) => Value::String(s),
        }
    }
}

/// A team registration line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRegistration {
    pub team_name: String,
    /// `DD/MM`
    #[serde(rename = "registration_date_ddmm")]
    pub registration_date: String,
    pub group_number: i64,
}

/// A match result line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub team_one: String,
    pub team_two: String,
    pub goals_one: i64,
    pub goals_two: i64,
}

/// A record built from one fully valid line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateRecord {
    TeamRegistration(TeamRegistration),
    MatchResult(MatchResult),
}

impl CandidateRecord {
    /// Get the kind of this record.
    pub fn kind(&self) -> RecordKind {
        match self {
            CandidateRecord::TeamRegistration(_) => RecordKind::TeamRegistration,
            CandidateRecord::MatchResult(_) => RecordKind::MatchResult,
        }
    }

    /// Build a record from positional values in schema order.
    ///
    /// The values are expected to have passed the schema already; a missing
    /// or mistyped value is still reported rather than panicking.
    pub fn from_values(kind: RecordKind, values: &[FieldValue]) -> Result<Self> {
        match kind {
            RecordKind::TeamRegistration => {
                Ok(CandidateRecord::TeamRegistration(TeamRegistration {
                    team_name: text_at(values, 0, "team_name")?,
                    registration_date: text_at(values, 1, "registration_date_ddmm")?,
                    group_number: integer_at(values, 2, "group_number")?,
                }))
            }
            RecordKind::MatchResult => Ok(CandidateRecord::MatchResult(MatchResult {
                team_one: text_at(values, 0, "team_one")?,
                team_two: text_at(values, 1, "team_two")?,
                goals_one: integer_at(values, 2, "goals_one")?,
                goals_two: integer_at(values, 3, "goals_two")?,
            })),
        }
    }

    /// The JSON object the server expects for this record inside a batch.
    pub fn to_wire(&self) -> Value {
        match self {
            CandidateRecord::TeamRegistration(team) => json!({
                "team_name": team.team_name,
                "registration_date_ddmm": team.registration_date,
                "group_number": team.group_number,
            }),
            CandidateRecord::MatchResult(result) => json!({
                "result": [
                    {"team_name": result.team_one, "goals_scored": result.goals_one},
                    {"team_name": result.team_two, "goals_scored": result.goals_two},
                ]
            }),
        }
    }
}

fn text_at(values: &[FieldValue], index: usize, field: &str) -> Result<String> {
    values
        .get(index)
        .and_then(FieldValue::as_text)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidValue {
            field: field.to_string(),
            message: "expected text".into(),
        })
}

fn integer_at(values: &[FieldValue], index: usize, field: &str) -> Result<i64> {
    values
        .get(index)
        .and_then(FieldValue::as_integer)
        .ok_or_else(|| Error::InvalidValue {
            field: field.to_string(),
            message: "expected whole number".into(),
        })
}
