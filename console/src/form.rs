//! Batch input form.
//!
//! Holds the raw buffer for one record kind, gives per-line feedback while
//! typing and submits every valid line as one request.

use tourney_engine::{
    assemble, line_index_at, live_feedback, retain_unsubmitted, Action, Assembly, BatchContext,
    LineFeedback, Outcome, RecordKind, RecordSchema, RoundNumber, Transcript,
};

use crate::api::Api;
use crate::error::Result;
use crate::session::{require, Role, Session};
use crate::view::wall_clock_ms;

/// Result of a submit.
#[derive(Debug, Clone)]
pub struct SubmitReport {
    pub assembly: Assembly,
    /// `None` when no line was valid and nothing was sent
    pub outcome: Option<Outcome>,
}

impl SubmitReport {
    pub fn sent(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Success))
    }
}

#[derive(Debug, Clone)]
pub struct BatchForm {
    schema: &'static RecordSchema,
    context: BatchContext,
    text: String,
}

impl BatchForm {
    pub fn new(kind: RecordKind, context: BatchContext) -> Self {
        Self {
            schema: RecordSchema::for_kind(kind),
            context,
            text: String::new(),
        }
    }

    /// Form for `<team_name> <registration_date> <group_number>` lines.
    pub fn team_registration() -> Self {
        Self::new(RecordKind::TeamRegistration, BatchContext::Registration)
    }

    /// Form for `<team_one> <team_two> <goals_one> <goals_two>` lines in one
    /// round.
    pub fn match_results(round: RoundNumber) -> Self {
        Self::new(RecordKind::MatchResult, BatchContext::Round(round))
    }

    pub fn kind(&self) -> RecordKind {
        self.schema.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Feedback for the line under the cursor (a byte offset into the buffer).
    pub fn feedback_at(&self, cursor: usize) -> LineFeedback {
        let index = line_index_at(&self.text, cursor);
        let line = self.text.split('\n').nth(index).unwrap_or("");
        let line = line.strip_suffix('\r').unwrap_or(line);
        live_feedback(index, line, self.schema)
    }

    pub fn assemble(&self) -> Assembly {
        assemble(&self.text, self.schema, self.context)
    }

    /// Submit every valid line as one request.
    ///
    /// Invalid lines are reported in the returned assembly and never sent.
    /// After a successful submit the buffer keeps only the lines that were
    /// not sent. A failed request leaves the buffer untouched.
    pub async fn submit(
        &mut self,
        api: &Api,
        session: &dyn Session,
        transcript: &mut Transcript,
    ) -> Result<SubmitReport> {
        require(session, Role::Admin)?;

        let assembly = self.assemble();
        let Some(payload) = &assembly.payload else {
            tracing::debug!(
                kind = %self.schema.kind,
                rejected = assembly.rejected(),
                "Nothing to submit"
            );
            return Ok(SubmitReport {
                assembly,
                outcome: None,
            });
        };

        let outcome = match api.submit(payload).await {
            Ok(_) => Outcome::Success,
            Err(e) => {
                tracing::warn!(kind = %payload.kind(), "Batch submit failed: {}", e);
                e.to_outcome()
            }
        };
        tracing::info!(
            kind = %payload.kind(),
            records = payload.len(),
            rejected = assembly.rejected(),
            success = outcome.is_success(),
            "Batch submitted"
        );

        transcript.append(
            wall_clock_ms(),
            Action::BatchSubmit {
                kind: payload.kind(),
                records: payload.len(),
            },
            payload.to_body(),
            outcome.clone(),
        );

        if outcome.is_success() {
            self.text = retain_unsubmitted(&self.text, &assembly);
        }

        Ok(SubmitReport {
            assembly,
            outcome: Some(outcome),
        })
    }
}
