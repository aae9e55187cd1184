//! Error types for the tourney engine.
//!
//! Line-level problems are not errors here: they are reported as
//! [`Diagnostic`](crate::Diagnostic)s and never leave the input buffer.

use crate::{FieldName, RecordKind, RowKey};
use thiserror::Error;

/// All possible errors from the tourney engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Batch errors
    #[error("batch has no accepted records")]
    EmptyBatch,

    #[error("record kind mismatch: expected {expected}, got {got}")]
    KindMismatch { expected: RecordKind, got: RecordKind },

    #[error("round number should be between 1 and 3 inclusive, got {0}")]
    InvalidRound(i64),

    #[error("group number must be either 1 or 2, got {0}")]
    InvalidGroup(i64),

    // Table errors
    #[error("column '{0}' is not editable")]
    NotEditable(FieldName),

    #[error("row not found: {0}")]
    RowNotFound(RowKey),

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: FieldName, message: String },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
