//! Batch assembly - from an input buffer to one request payload.
//!
//! Each non-empty line is checked independently. Lines that pass become
//! records in buffer order; lines that fail keep their diagnostics and are
//! left out of the payload. A buffer with no accepted lines has no payload.

use crate::error::{Error, Result};
use crate::grammar::Diagnostic;
use crate::line::check_line;
use crate::{CandidateRecord, LineIndex, RecordKind, RecordSchema, RoundNumber};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Scope a batch is submitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchContext {
    /// Team registrations carry their group on every line
    Registration,
    /// Match results belong to one round
    Round(RoundNumber),
}

/// Accepted records ready to be sent as one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPayload {
    kind: RecordKind,
    records: Vec<CandidateRecord>,
    context: BatchContext,
}

impl BatchPayload {
    /// Build a payload, checking that it is non-empty and of a single kind.
    pub fn new(
        kind: RecordKind,
        records: Vec<CandidateRecord>,
        context: BatchContext,
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::EmptyBatch);
        }
        if let Some(other) = records.iter().find(|r| r.kind() != kind) {
            return Err(Error::KindMismatch {
                expected: kind,
                got: other.kind(),
            });
        }
        Ok(Self {
            kind,
            records,
            context,
        })
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn context(&self) -> BatchContext {
        self.context
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a constructed payload.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Request body in the shape the server expects.
    pub fn to_body(&self) -> Value {
        let records: Vec<Value> = self.records.iter().map(CandidateRecord::to_wire).collect();
        match self.context {
            BatchContext::Registration => json!({ "teams": records }),
            BatchContext::Round(round) => json!({
                "results": records,
                "round_number": round.get(),
            }),
        }
    }
}

/// Outcome of assembling a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assembly {
    /// `None` when no line was accepted
    pub payload: Option<BatchPayload>,
    /// Diagnostics of rejected lines, keyed by line index
    pub diagnostics: BTreeMap<LineIndex, Vec<Diagnostic>>,
    /// Indices of the lines that made it into the payload
    pub accepted_lines: Vec<LineIndex>,
}

impl Assembly {
    /// Number of lines rejected.
    pub fn rejected(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// All diagnostics in line order.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.values().flatten()
    }
}

/// Assemble a buffer. Lines are split on `\n`; a trailing `\r` is ignored.
pub fn assemble(buffer: &str, schema: &RecordSchema, context: BatchContext) -> Assembly {
    assemble_lines(buffer.split('\n'), schema, context)
}

/// Assemble from already split lines. Line indices follow iteration order.
pub fn assemble_lines<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    schema: &RecordSchema,
    context: BatchContext,
) -> Assembly {
    let mut records = Vec::new();
    let mut accepted_lines = Vec::new();
    let mut diagnostics = BTreeMap::new();

    for (index, line) in lines.into_iter().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        match check_line(index, line, schema) {
            Ok(record) => {
                records.push(record);
                accepted_lines.push(index);
            }
            Err(found) => {
                diagnostics.insert(index, found);
            }
        }
    }

    let payload = BatchPayload::new(schema.kind, records, context).ok();

    Assembly {
        payload,
        diagnostics,
        accepted_lines,
    }
}

/// Index of the line containing a byte offset in the buffer.
///
/// Offsets past the end map to the last line. An offset inside a multi-byte
/// character counts the newlines before it.
pub fn line_index_at(buffer: &str, cursor: usize) -> LineIndex {
    let end = cursor.min(buffer.len());
    buffer.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count()
}

/// The buffer with accepted lines removed, so only lines still needing
/// attention remain after a successful submit.
pub fn retain_unsubmitted(buffer: &str, assembly: &Assembly) -> String {
    buffer
        .split('\n')
        .enumerate()
        .filter(|(index, line)| {
            assembly.accepted_lines.binary_search(index).is_err() && !line.trim().is_empty()
        })
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n")
}
