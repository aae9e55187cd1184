//! # Tourney Engine
//!
//! The pure core of the tournament console: it turns free-form batch input into
//! validated records and keeps a locally edited table consistent with the
//! snapshots the server pushes.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about sockets, HTTP or timers
//! - **Deterministic**: the same buffer always assembles to the same payload
//! - **Time is an input**: every operation that cares about time takes a
//!   millisecond [`Timestamp`]
//!
//! ## Core Concepts
//!
//! ### Line grammar and rules
//!
//! Each buffer line is split on whitespace and mapped positionally onto a
//! [`RecordSchema`]. Tokens for integer fields are coerced by the
//! [`grammar`] module; the declarative [`FieldRule`]s of the schema then check
//! shape, length, range and calendar constraints. Problems surface as
//! [`Diagnostic`]s bound to a line index and, when known, a field.
//!
//! ### Batch assembly
//!
//! [`assemble`] partitions a buffer into accepted [`CandidateRecord`]s and
//! per-line diagnostics. Bad lines are skipped; the rest form one
//! [`BatchPayload`]. An empty accepted set yields no payload at all.
//!
//! ### Snapshots and optimistic edits
//!
//! A [`Snapshot`] is the server's whole table for a [`Topic`]. The
//! [`Reconciler`] overlays pending local cell edits on top of the latest
//! snapshot and drops them once a newer snapshot supersedes them, the server
//! rejects them, or they time out.
//!
//! ### Transcript
//!
//! [`Transcript`] is a bounded log of request outcomes shown to the operator.
//!
//! ## Quick Start
//!
//! ```rust
//! use tourney_engine::{assemble, BatchContext, RecordSchema, RoundNumber};
//!
//! let buffer = "Lions Tigers 2 3\nLions Tigers 2\nBears Wolves 0 0";
//! let schema = RecordSchema::match_result();
//! let round = RoundNumber::new(1).unwrap();
//!
//! let assembly = assemble(buffer, schema, BatchContext::Round(round));
//!
//! let payload = assembly.payload.as_ref().unwrap();
//! assert_eq!(payload.len(), 2);
//! assert_eq!(assembly.diagnostics[&1].len(), 1);
//! ```

pub mod batch;
pub mod error;
pub mod grammar;
pub mod line;
pub mod reconcile;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod topic;
pub mod transcript;

// Re-export main types at crate root
pub use batch::{
    assemble, assemble_lines, line_index_at, retain_unsubmitted, Assembly, BatchContext,
    BatchPayload,
};
pub use error::Error;
pub use grammar::{parse_prefix, tokenize, Diagnostic, DiagnosticKind, PrefixParse};
pub use line::{check_line, live_feedback, LineFeedback, LineStatus};
pub use reconcile::{EditTicket, PendingEdit, Reconciler, Resolution, Rollback, SnapshotApplied};
pub use record::{CandidateRecord, FieldValue, MatchResult, RecordKind, TeamRegistration};
pub use schema::{Constraint, FieldRule, FieldType, RecordSchema, Violation};
pub use snapshot::{sorted_view, Row, Snapshot, SortDirection};
pub use topic::{GroupNumber, RoundNumber, Topic};
pub use transcript::{Action, Entry, Outcome, Transcript};

/// Type aliases for clarity
pub type LineIndex = usize;
pub type RowKey = i64;
pub type FieldName = String;
pub type EditId = u64;
pub type Timestamp = u64;
