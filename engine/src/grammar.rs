//! Line grammar: whitespace-separated tokens mapped positionally onto fields.
//!
//! The grammar only knows about arity and types: tokens are coerced to their
//! field's type in order, and a wrong token count is reported as a single
//! arity diagnostic by the line checks built on top.

use crate::{schema::Constraint, FieldValue, LineIndex, RecordSchema, Violation};
use serde::{Deserialize, Serialize};

/// What kind of problem a diagnostic reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    ArityMismatch { expected: usize, found: usize },
    TypeMismatch,
    ConstraintViolation { constraint: Constraint },
}

/// A problem with one line of input, optionally tied to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line_index: LineIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    /// Wrong number of tokens on a line.
    pub fn arity(line_index: LineIndex, expected: usize, found: usize) -> Self {
        let message = if found > expected {
            format!("expected {} args only", expected)
        } else {
            format!("expected {} args, got {}", expected, found)
        };
        Self {
            line_index,
            field: None,
            kind: DiagnosticKind::ArityMismatch { expected, found },
            message,
        }
    }

    /// Attach a rule violation to a line.
    pub fn from_violation(line_index: LineIndex, violation: Violation) -> Self {
        let kind = match violation.constraint {
            Constraint::Type => DiagnosticKind::TypeMismatch,
            constraint => DiagnosticKind::ConstraintViolation { constraint },
        };
        Self {
            line_index,
            field: Some(violation.field.to_string()),
            kind,
            message: violation.message,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "line {} [{}]: {}", self.line_index + 1, field, self.message),
            None => write!(f, "line {}: {}", self.line_index + 1, self.message),
        }
    }
}

/// Split a line on runs of whitespace.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Result of parsing the part of a line typed so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixParse {
    /// One slot per token present, at most the arity, in field order
    pub slots: Vec<Result<FieldValue, Diagnostic>>,
    /// Tokens beyond the schema's arity
    pub extra_tokens: usize,
}

impl PrefixParse {
    /// Number of tokens on the line.
    pub fn token_count(&self) -> usize {
        self.slots.len() + self.extra_tokens
    }

    /// Number of fields still missing from the line.
    pub fn missing(&self, schema: &RecordSchema) -> usize {
        schema.arity().saturating_sub(self.slots.len())
    }

    /// Type errors for the tokens present.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.slots.iter().filter_map(|slot| slot.as_ref().err())
    }
}

/// Parse however many tokens are present, for live feedback while typing.
pub fn parse_prefix(line_index: LineIndex, line: &str, schema: &RecordSchema) -> PrefixParse {
    let tokens = tokenize(line);
    let extra_tokens = tokens.len().saturating_sub(schema.arity());

    let slots = schema
        .fields
        .iter()
        .zip(&tokens)
        .map(|(rule, token)| {
            rule.coerce(token)
                .map_err(|violation| Diagnostic::from_violation(line_index, violation))
        })
        .collect();

    PrefixParse {
        slots,
        extra_tokens,
    }
}
