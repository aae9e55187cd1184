//! Bounded log of request outcomes shown to the operator.

use crate::{RecordKind, RowKey, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 200;

/// What the operator did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    BatchSubmit { kind: RecordKind, records: usize },
    CellUpdate { row_key: RowKey, field: String },
    RowDelete { row_key: RowKey },
    EditTimeout { row_key: RowKey, field: String },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::BatchSubmit { kind, records } => {
                write!(f, "Create {} ({} records):", kind, records)
            }
            Action::CellUpdate { row_key, field } => write!(f, "Update {} of {}:", field, row_key),
            Action::RowDelete { row_key } => write!(f, "Delete {}:", row_key),
            Action::EditTimeout { row_key, field } => {
                write!(f, "Edit of {} on {} timed out:", field, row_key)
            }
        }
    }
}

/// How the server (or the network) answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Rejected { status: u16, body: Value },
    TransportError { message: String },
    TimedOut,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Rejected { status, body } => write!(f, "error {}: {}", status, body),
            Outcome::TransportError { message } => write!(f, "error: {}", message),
            Outcome::TimedOut => write!(f, "no confirmation, change reverted"),
        }
    }
}

/// One logged request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub seq: u64,
    pub at: Timestamp,
    pub action: Action,
    pub body: Value,
    pub outcome: Outcome,
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = serde_json::to_string_pretty(&self.body).map_err(|_| std::fmt::Error)?;
        writeln!(f, "{}", self.action)?;
        writeln!(f, "body:")?;
        writeln!(f, "{}", body)?;
        writeln!(f, "Server Response:")?;
        writeln!(f, "{}", self.outcome)?;
        write!(f, "---")
    }
}

/// Append-only log that evicts its oldest entry when full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    entries: VecDeque<Entry>,
    capacity: usize,
    next_seq: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Transcript {
    /// Create a transcript keeping at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Append an entry, returning its sequence number.
    pub fn append(&mut self, at: Timestamp, action: Action, body: Value, outcome: Outcome) -> u64 {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(Entry {
            seq,
            at,
            action,
            body,
            outcome,
        });
        seq
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The whole log as console text.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(Entry::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eviction_keeps_newest() {
        let mut transcript = Transcript::new(2);
        for row_key in 0..3 {
            transcript.append(0, Action::RowDelete { row_key }, json!({}), Outcome::Success);
        }

        assert_eq!(transcript.len(), 2);
        let seqs: Vec<u64> = transcript.entries().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(transcript.last().unwrap().action, Action::RowDelete { row_key: 2 });
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut transcript = Transcript::new(0);
        transcript.append(0, Action::RowDelete { row_key: 1 }, json!(null), Outcome::TimedOut);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn render_entry() {
        let mut transcript = Transcript::default();
        transcript.append(
            5,
            Action::CellUpdate {
                row_key: 7,
                field: "team_1_goals".into(),
            },
            json!({"team_goals": 3}),
            Outcome::Rejected {
                status: 422,
                body: json!({"detail": "bad"}),
            },
        );

        let text = transcript.render();
        assert!(text.starts_with("Update team_1_goals of 7:\nbody:\n"));
        assert!(text.contains("\"team_goals\": 3"));
        assert!(text.contains("Server Response:\nerror 422: {\"detail\":\"bad\"}\n---"));
    }
}
