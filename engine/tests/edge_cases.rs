//! Edge case tests for tourney-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use tourney_engine::{
    assemble, check_line, line_index_at, live_feedback, retain_unsubmitted, BatchContext,
    DiagnosticKind, FieldValue, LineStatus, RecordSchema, Reconciler, Resolution, RoundNumber,
    Snapshot, Topic, Transcript,
};
use serde_json::json;

fn round(n: i64) -> BatchContext {
    BatchContext::Round(RoundNumber::new(n).unwrap())
}

// ============================================================================
// Line Edge Cases
// ============================================================================

#[test]
fn three_line_batch_with_bad_middle_line() {
    let buffer = "Lions Tigers 2 3\nLions Tigers 2\nBears Wolves 1 1";
    let assembly = assemble(buffer, RecordSchema::match_result(), round(1));

    assert_eq!(assembly.accepted_lines, vec![0, 2]);
    assert_eq!(assembly.diagnostics.len(), 1);
    assert_eq!(assembly.diagnostics[&1].len(), 1);
    assert_eq!(
        assembly.diagnostics[&1][0].kind,
        DiagnosticKind::ArityMismatch {
            expected: 4,
            found: 3
        }
    );

    let body = assembly.payload.unwrap().to_body();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["result"][0]["team_name"], "Lions");
    assert_eq!(results[1]["result"][0]["team_name"], "Bears");
}

#[test]
fn team_name_length_boundary() {
    let schema = RecordSchema::team_registration();
    let fifty = "a".repeat(50);
    let fifty_one = "a".repeat(51);

    assert!(check_line(0, &format!("{} 01/01 1", fifty), schema).is_ok());

    let diagnostics = check_line(0, &format!("{} 01/01 1", fifty_one), schema).unwrap_err();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].field.as_deref(), Some("team_name"));
}

#[test]
fn team_names_allow_hyphen_and_underscore() {
    let schema = RecordSchema::team_registration();
    assert!(check_line(0, "Red-Lions_2 01/01 2", schema).is_ok());
    assert!(check_line(0, "Löwen 01/01 2", schema).is_err());
}

#[test]
fn calendar_days() {
    let schema = RecordSchema::team_registration();
    for ok in ["01/01", "29/02", "31/12", "30/04"] {
        assert!(check_line(0, &format!("Lions {} 1", ok), schema).is_ok(), "{}", ok);
    }
    for bad in ["31/02", "00/01", "31/04", "01/13", "1/1", "01-01", "001/1"] {
        assert!(check_line(0, &format!("Lions {} 1", bad), schema).is_err(), "{}", bad);
    }
}

#[test]
fn group_and_goal_ranges() {
    let teams = RecordSchema::team_registration();
    assert!(check_line(0, "Lions 01/01 0", teams).is_err());
    assert!(check_line(0, "Lions 01/01 3", teams).is_err());

    let matches = RecordSchema::match_result();
    assert!(check_line(0, "Lions Tigers 0 0", matches).is_ok());
    assert!(check_line(0, "Lions Tigers -1 0", matches).is_err());
    assert!(check_line(0, "Lions Tigers 1.5 0", matches).is_err());
}

#[test]
fn tabs_and_runs_of_spaces() {
    let record = check_line(0, "\tLions \t  Tigers  2\t3  ", RecordSchema::match_result());
    assert!(record.is_ok());
}

#[test]
fn huge_goal_count_is_a_type_error() {
    let diagnostics = check_line(
        0,
        "Lions Tigers 99999999999999999999 1",
        RecordSchema::match_result(),
    )
    .unwrap_err();
    assert_eq!(diagnostics[0].kind, DiagnosticKind::TypeMismatch);
}

// ============================================================================
// Buffer Edge Cases
// ============================================================================

#[test]
fn windows_line_endings() {
    let buffer = "Lions 01/01 1\r\nTigers 02/01 2\r\n";
    let assembly = assemble(buffer, RecordSchema::team_registration(), BatchContext::Registration);
    assert_eq!(assembly.accepted_lines, vec![0, 1]);
    assert!(assembly.diagnostics.is_empty());
}

#[test]
fn cursor_feedback_on_last_line() {
    let buffer = "Lions 01/01 1\nTigers 3";
    let index = line_index_at(buffer, buffer.len());
    assert_eq!(index, 1);

    let line = buffer.split('\n').nth(index).unwrap();
    let feedback = live_feedback(index, line, RecordSchema::team_registration());
    assert_eq!(feedback.status, LineStatus::Invalid);
    assert_eq!(feedback.missing, vec!["group number"]);
}

#[test]
fn resubmitting_retained_lines() {
    let buffer = "Lions Tigers 2 3\nLions Tigers two 3";
    let assembly = assemble(buffer, RecordSchema::match_result(), round(2));
    let remaining = retain_unsubmitted(buffer, &assembly);
    assert_eq!(remaining, "Lions Tigers two 3");

    let fixed = remaining.replace("two", "2");
    let assembly = assemble(&fixed, RecordSchema::match_result(), round(2));
    assert_eq!(assembly.payload.as_ref().unwrap().len(), 1);
    assert_eq!(retain_unsubmitted(&fixed, &assembly), "");
}

// ============================================================================
// Reconciliation Edge Cases
// ============================================================================

fn teams_snapshot(name: &str) -> Snapshot {
    Snapshot::from_value(
        Topic::Teams,
        json!([{"team_id": 1, "team_name": name, "registration_date_ddmm": "01/01",
                "group_number": 1}]),
    )
    .unwrap()
}

#[test]
fn snapshot_equal_to_prior_keeps_edit() {
    let mut reconciler = Reconciler::with_snapshot(teams_snapshot("Lions"));
    reconciler
        .apply_local_edit(1, "team_name", FieldValue::Text("Pumas".into()), 0)
        .unwrap();

    // unrelated push still carries the old name
    let applied = reconciler.apply_snapshot(teams_snapshot("Lions")).unwrap();
    assert!(applied.superseded.is_empty());
    assert_eq!(applied.rows[0].get("team_name"), Some(&json!("Pumas")));
}

#[test]
fn snapshot_from_another_writer_wins() {
    let mut reconciler = Reconciler::with_snapshot(teams_snapshot("Lions"));
    let ticket = reconciler
        .apply_local_edit(1, "team_name", FieldValue::Text("Pumas".into()), 0)
        .unwrap();

    let applied = reconciler.apply_snapshot(teams_snapshot("Jaguars")).unwrap();
    assert_eq!(applied.superseded, vec![ticket.edit_id]);
    assert_eq!(reconciler.value(1, "team_name"), Some(json!("Jaguars")));

    // a late rejection has nothing left to undo
    assert_eq!(reconciler.reject(ticket.edit_id), Resolution::Stale);
    assert_eq!(reconciler.value(1, "team_name"), Some(json!("Jaguars")));
}

#[test]
fn invalid_date_edit_never_becomes_pending() {
    let mut reconciler = Reconciler::with_snapshot(teams_snapshot("Lions"));
    let result = reconciler.apply_local_edit(
        1,
        "registration_date_ddmm",
        FieldValue::Text("31/02".into()),
        0,
    );
    assert!(result.is_err());
    assert_eq!(reconciler.pending().count(), 0);
}

// ============================================================================
// Transcript Edge Cases
// ============================================================================

#[test]
fn transcript_sequence_survives_eviction() {
    use tourney_engine::{Action, Outcome};

    let mut transcript = Transcript::new(3);
    for row_key in 0..10 {
        transcript.append(row_key as u64, Action::RowDelete { row_key }, json!({}), Outcome::Success);
    }
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript.entries().next().unwrap().seq, 7);
    assert_eq!(transcript.last().unwrap().seq, 9);
}
