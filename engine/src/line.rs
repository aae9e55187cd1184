//! Per-line checking.
//!
//! [`check_line`] is the strict form used by batch assembly: a line either
//! becomes one record or a set of diagnostics. [`live_feedback`] is the
//! forgiving form used while the operator is still typing: it validates only
//! the fields present and lists the ones still missing.

use crate::grammar::{parse_prefix, Diagnostic, DiagnosticKind, PrefixParse};
use crate::{CandidateRecord, FieldValue, LineIndex, RecordSchema};
use serde::Serialize;

/// Check a complete line, producing either its record or its diagnostics.
///
/// A wrong token count yields exactly one arity diagnostic. Otherwise type
/// and constraint problems are reported for every field, in field order.
pub fn check_line(
    line_index: LineIndex,
    line: &str,
    schema: &RecordSchema,
) -> Result<CandidateRecord, Vec<Diagnostic>> {
    let prefix = parse_prefix(line_index, line, schema);
    if prefix.token_count() != schema.arity() {
        return Err(vec![Diagnostic::arity(
            line_index,
            schema.arity(),
            prefix.token_count(),
        )]);
    }

    let diagnostics = field_diagnostics(line_index, schema, &prefix);
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let values: Vec<FieldValue> = prefix.slots.into_iter().flatten().collect();
    CandidateRecord::from_values(schema.kind, &values).map_err(|err| {
        vec![Diagnostic {
            line_index,
            field: None,
            kind: DiagnosticKind::TypeMismatch,
            message: err.to_string(),
        }]
    })
}

/// Type errors and rule violations for the fields present, in field order.
fn field_diagnostics(
    line_index: LineIndex,
    schema: &RecordSchema,
    prefix: &PrefixParse,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (rule, slot) in schema.fields.iter().zip(&prefix.slots) {
        match slot {
            Ok(value) => diagnostics.extend(
                rule.validate(value)
                    .into_iter()
                    .map(|v| Diagnostic::from_violation(line_index, v)),
            ),
            Err(diagnostic) => diagnostics.push(diagnostic.clone()),
        }
    }
    diagnostics
}

/// Overall state of a line while it is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Nothing typed; skipped on submit
    Empty,
    /// Every present field is fine but some are still missing
    Incomplete,
    /// At least one diagnostic
    Invalid,
    /// Complete and valid; will be submitted
    Valid,
}

/// Live feedback for one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFeedback {
    pub line_index: LineIndex,
    pub status: LineStatus,
    pub diagnostics: Vec<Diagnostic>,
    /// Labels of fields not typed yet, in order
    pub missing: Vec<&'static str>,
}

impl LineFeedback {
    /// Messages to show next to the line: diagnostics first, then one
    /// `<placeholder>` per missing field.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| d.message.clone())
            .chain(self.missing.iter().map(|label| format!("<{}>", label)))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.status == LineStatus::Valid
    }
}

/// Validate the fields typed so far on a line.
pub fn live_feedback(line_index: LineIndex, line: &str, schema: &RecordSchema) -> LineFeedback {
    let prefix = parse_prefix(line_index, line, schema);

    if prefix.slots.is_empty() {
        return LineFeedback {
            line_index,
            status: LineStatus::Empty,
            diagnostics: Vec::new(),
            missing: schema.fields.iter().map(|f| f.label).collect(),
        };
    }

    if prefix.extra_tokens > 0 {
        return LineFeedback {
            line_index,
            status: LineStatus::Invalid,
            diagnostics: vec![Diagnostic::arity(
                line_index,
                schema.arity(),
                prefix.token_count(),
            )],
            missing: Vec::new(),
        };
    }

    let diagnostics = field_diagnostics(line_index, schema, &prefix);
    let missing: Vec<&'static str> = schema.fields[prefix.slots.len()..]
        .iter()
        .map(|f| f.label)
        .collect();

    let status = if !diagnostics.is_empty() {
        LineStatus::Invalid
    } else if !missing.is_empty() {
        LineStatus::Incomplete
    } else {
        LineStatus::Valid
    };

    LineFeedback {
        line_index,
        status,
        diagnostics,
        missing,
    }
}
