//! Optimistic edit reconciliation.
//!
//! The reconciler owns the latest authoritative [`Snapshot`] for a topic and
//! at most one [`PendingEdit`] per cell. The rendered table is the snapshot
//! with pending values laid over it.
//!
//! # Lifecycle of a pending edit
//!
//! 1. [`Reconciler::apply_local_edit`] validates the value against the
//!    column rule and records it; the overlay shows it immediately
//! 2. A later snapshot that shows the edit's value confirms it; one whose
//!    value differs from the edit's prior value supersedes it (so does a
//!    snapshot without the row)
//! 3. A rejection rolls the cell back to its prior value, unless the edit
//!    was already replaced or superseded
//! 4. An edit still pending after the timeout is rolled back

use crate::error::{Error, Result};
use crate::snapshot::{Row, Snapshot};
use crate::{EditId, FieldName, FieldValue, RowKey, Timestamp, Topic};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A local cell edit awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEdit {
    pub edit_id: EditId,
    pub row_key: RowKey,
    pub field: FieldName,
    pub optimistic_value: Value,
    /// Server value before the first unresolved edit of this cell
    pub prior_value: Value,
    pub submitted_at: Timestamp,
    /// The update request succeeded; still waiting for a snapshot
    pub acknowledged: bool,
}

/// What the caller needs to issue the update request for an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditTicket {
    pub edit_id: EditId,
    pub row_key: RowKey,
    pub field: FieldName,
    pub value: Value,
    /// The row as displayed after the edit
    pub row: Row,
}

/// A cell restored to its server value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollback {
    pub edit_id: EditId,
    pub row_key: RowKey,
    pub field: FieldName,
    pub restored_value: Value,
}

/// Outcome of a rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    RolledBack(Rollback),
    /// The edit had already been replaced, superseded or expired
    Stale,
}

/// Outcome of applying a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotApplied {
    pub superseded: Vec<EditId>,
    pub rows: Vec<Row>,
}

/// Pending edits layered over the latest snapshot of one topic.
#[derive(Debug, Clone)]
pub struct Reconciler {
    snapshot: Snapshot,
    pending: BTreeMap<(RowKey, FieldName), PendingEdit>,
    next_edit_id: EditId,
}

impl Reconciler {
    /// Start with an empty table for the topic.
    pub fn new(topic: Topic) -> Self {
        Self::with_snapshot(Snapshot::empty(topic))
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            pending: BTreeMap::new(),
            next_edit_id: 1,
        }
    }

    pub fn topic(&self) -> Topic {
        self.snapshot.topic
    }

    /// The latest authoritative snapshot, without overlay.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Coerce raw cell input to the column's type.
    pub fn coerce(&self, field: &str, input: &str) -> Result<FieldValue> {
        let rule = self.topic().column_rule(field)?;
        rule.coerce(input.trim()).map_err(|v| Error::InvalidValue {
            field: field.to_string(),
            message: v.message,
        })
    }

    /// Apply a local edit optimistically.
    ///
    /// A second edit of the same cell replaces the first: it gets a new edit
    /// id and a fresh timestamp but keeps the original prior value.
    pub fn apply_local_edit(
        &mut self,
        row_key: RowKey,
        field: &str,
        value: FieldValue,
        now: Timestamp,
    ) -> Result<EditTicket> {
        let rule = self.topic().column_rule(field)?;
        let violations = rule.validate(&value);
        if !violations.is_empty() {
            let message = violations
                .into_iter()
                .map(|v| v.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::InvalidValue {
                field: field.to_string(),
                message,
            });
        }

        let server_row = self
            .snapshot
            .row(row_key)
            .ok_or(Error::RowNotFound(row_key))?;

        let cell = (row_key, field.to_string());
        let prior_value = match self.pending.get(&cell) {
            Some(previous) => previous.prior_value.clone(),
            None => server_row.get(field).cloned().unwrap_or(Value::Null),
        };

        let edit_id = self.next_edit_id;
        self.next_edit_id += 1;

        let value = Value::from(value);
        self.pending.insert(
            cell,
            PendingEdit {
                edit_id,
                row_key,
                field: field.to_string(),
                optimistic_value: value.clone(),
                prior_value,
                submitted_at: now,
                acknowledged: false,
            },
        );

        Ok(EditTicket {
            edit_id,
            row_key,
            field: field.to_string(),
            value,
            row: self.overlay(server_row),
        })
    }

    /// Mark an edit's request as accepted. Returns false if it is no longer
    /// pending.
    pub fn acknowledge(&mut self, edit_id: EditId) -> bool {
        match self.pending.values_mut().find(|p| p.edit_id == edit_id) {
            Some(edit) => {
                edit.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// The server rejected an edit's request.
    pub fn reject(&mut self, edit_id: EditId) -> Resolution {
        let cell = self
            .pending
            .iter()
            .find(|(_, p)| p.edit_id == edit_id)
            .map(|(cell, _)| cell.clone());

        match cell.and_then(|cell| self.pending.remove(&cell)) {
            Some(edit) => Resolution::RolledBack(Rollback {
                edit_id,
                row_key: edit.row_key,
                field: edit.field,
                restored_value: edit.prior_value,
            }),
            None => Resolution::Stale,
        }
    }

    /// Replace the authoritative snapshot and drop confirmed or superseded
    /// edits.
    ///
    /// An edit survives only while the snapshot still shows its prior value
    /// and that value is not also the edit's own.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Result<SnapshotApplied> {
        if snapshot.topic != self.topic() {
            return Err(Error::InvalidSnapshot(format!(
                "snapshot for '{}' applied to '{}'",
                snapshot.topic,
                self.topic()
            )));
        }

        let mut superseded = Vec::new();
        self.pending.retain(|(row_key, field), edit| {
            let keep = match snapshot.row(*row_key) {
                Some(row) => {
                    let current = row.get(field).unwrap_or(&Value::Null);
                    current == &edit.prior_value && current != &edit.optimistic_value
                }
                None => false,
            };
            if !keep {
                superseded.push(edit.edit_id);
            }
            keep
        });
        superseded.sort_unstable();

        self.snapshot = snapshot;
        Ok(SnapshotApplied {
            superseded,
            rows: self.rows(),
        })
    }

    /// Roll back every edit pending for at least `timeout_ms`.
    pub fn expire(&mut self, now: Timestamp, timeout_ms: u64) -> Vec<Rollback> {
        let mut expired = Vec::new();
        self.pending.retain(|_, edit| {
            if now.saturating_sub(edit.submitted_at) >= timeout_ms {
                expired.push(Rollback {
                    edit_id: edit.edit_id,
                    row_key: edit.row_key,
                    field: edit.field.clone(),
                    restored_value: edit.prior_value.clone(),
                });
                false
            } else {
                true
            }
        });
        expired.sort_by_key(|r| r.edit_id);
        expired
    }

    /// Earliest time at which a pending edit expires.
    pub fn next_deadline(&self, timeout_ms: u64) -> Option<Timestamp> {
        self.pending
            .values()
            .map(|edit| edit.submitted_at.saturating_add(timeout_ms))
            .min()
    }

    /// Rows as displayed: snapshot order, pending values laid over.
    pub fn rows(&self) -> Vec<Row> {
        self.snapshot.rows.iter().map(|row| self.overlay(row)).collect()
    }

    /// A displayed cell value.
    pub fn value(&self, row_key: RowKey, field: &str) -> Option<Value> {
        if let Some(edit) = self.pending.get(&(row_key, field.to_string())) {
            return Some(edit.optimistic_value.clone());
        }
        self.snapshot.value(row_key, field).cloned()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingEdit> {
        self.pending.values()
    }

    /// Get the pending edit for a cell.
    pub fn pending_for(&self, row_key: RowKey, field: &str) -> Option<&PendingEdit> {
        self.pending.get(&(row_key, field.to_string()))
    }

    fn overlay(&self, row: &Row) -> Row {
        let mut row = row.clone();
        for ((_, field), edit) in self.pending.range((row.key, String::new())..) {
            if edit.row_key != row.key {
                break;
            }
            row.set(field, edit.optimistic_value.clone());
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoundNumber;
    use serde_json::json;

    fn topic() -> Topic {
        Topic::MatchResults {
            round: RoundNumber::new(1).unwrap(),
        }
    }

    fn snapshot(goals: &[(RowKey, i64, i64)]) -> Snapshot {
        let rows = goals
            .iter()
            .map(|(id, one, two)| {
                json!({"match_id": id, "team_1_id": 1, "team_1_goals": one,
                       "team_2_id": 2, "team_2_goals": two})
            })
            .collect::<Vec<_>>();
        Snapshot::from_value(topic(), json!({ "match_results": rows })).unwrap()
    }

    fn reconciler() -> Reconciler {
        Reconciler::with_snapshot(snapshot(&[(1, 2, 3), (2, 0, 0)]))
    }

    #[test]
    fn optimistic_value_is_visible() {
        let mut r = reconciler();
        let ticket = r
            .apply_local_edit(1, "team_1_goals", FieldValue::Integer(5), 100)
            .unwrap();

        assert_eq!(ticket.value, json!(5));
        assert_eq!(ticket.row.get("team_1_goals"), Some(&json!(5)));
        assert_eq!(r.value(1, "team_1_goals"), Some(json!(5)));
        assert_eq!(r.rows()[0].get("team_1_goals"), Some(&json!(5)));
        // server copy untouched
        assert_eq!(r.snapshot().value(1, "team_1_goals"), Some(&json!(2)));
    }

    #[test]
    fn invalid_edits_are_refused() {
        let mut r = reconciler();

        let err = r
            .apply_local_edit(1, "team_1_goals", FieldValue::Integer(-1), 0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));

        let err = r
            .apply_local_edit(1, "match_id", FieldValue::Integer(9), 0)
            .unwrap_err();
        assert_eq!(err, Error::NotEditable("match_id".into()));

        let err = r
            .apply_local_edit(42, "team_1_goals", FieldValue::Integer(1), 0)
            .unwrap_err();
        assert_eq!(err, Error::RowNotFound(42));

        assert_eq!(r.pending().count(), 0);
    }

    #[test]
    fn reject_rolls_back() {
        let mut r = reconciler();
        let ticket = r
            .apply_local_edit(1, "team_2_goals", FieldValue::Integer(9), 0)
            .unwrap();

        match r.reject(ticket.edit_id) {
            Resolution::RolledBack(rollback) => assert_eq!(rollback.restored_value, json!(3)),
            Resolution::Stale => panic!("expected rollback"),
        }
        assert_eq!(r.value(1, "team_2_goals"), Some(json!(3)));
        assert_eq!(r.reject(ticket.edit_id), Resolution::Stale);
    }

    #[test]
    fn second_edit_replaces_first() {
        let mut r = reconciler();
        let first = r
            .apply_local_edit(1, "team_1_goals", FieldValue::Integer(4), 0)
            .unwrap();
        let second = r
            .apply_local_edit(1, "team_1_goals", FieldValue::Integer(6), 10)
            .unwrap();

        assert_eq!(r.pending().count(), 1);
        let pending = r.pending_for(1, "team_1_goals").unwrap();
        assert_eq!(pending.prior_value, json!(2));
        assert_eq!(pending.submitted_at, 10);

        // rejecting the replaced edit keeps the newer value
        assert_eq!(r.reject(first.edit_id), Resolution::Stale);
        assert_eq!(r.value(1, "team_1_goals"), Some(json!(6)));

        assert!(matches!(r.reject(second.edit_id), Resolution::RolledBack(_)));
        assert_eq!(r.value(1, "team_1_goals"), Some(json!(2)));
    }

    #[test]
    fn snapshot_supersedes_changed_cells_only() {
        let mut r = reconciler();
        let changed = r
            .apply_local_edit(1, "team_1_goals", FieldValue::Integer(7), 0)
            .unwrap();
        let unchanged = r
            .apply_local_edit(2, "team_2_goals", FieldValue::Integer(1), 0)
            .unwrap();
        assert!(r.acknowledge(changed.edit_id));

        let applied = r.apply_snapshot(snapshot(&[(1, 7, 3), (2, 0, 0)])).unwrap();

        assert_eq!(applied.superseded, vec![changed.edit_id]);
        assert_eq!(
            r.pending_for(2, "team_2_goals").map(|p| p.edit_id),
            Some(unchanged.edit_id)
        );
        assert_eq!(r.value(2, "team_2_goals"), Some(json!(1)));
        assert_eq!(r.reject(changed.edit_id), Resolution::Stale);
    }

    #[test]
    fn snapshot_showing_reverted_value_confirms_edit() {
        let mut r = reconciler();
        r.apply_local_edit(1, "team_1_goals", FieldValue::Integer(5), 0)
            .unwrap();
        // corrected back to the server value before the first edit resolved
        let reverted = r
            .apply_local_edit(1, "team_1_goals", FieldValue::Integer(2), 10)
            .unwrap();
        assert!(r.acknowledge(reverted.edit_id));

        let applied = r.apply_snapshot(snapshot(&[(1, 2, 3), (2, 0, 0)])).unwrap();

        assert_eq!(applied.superseded, vec![reverted.edit_id]);
        assert_eq!(r.pending().count(), 0);
        assert!(r.expire(15_010, 15_000).is_empty());
        assert_eq!(r.value(1, "team_1_goals"), Some(json!(2)));
    }

    #[test]
    fn snapshot_without_row_supersedes() {
        let mut r = reconciler();
        let ticket = r
            .apply_local_edit(2, "team_1_goals", FieldValue::Integer(1), 0)
            .unwrap();

        let applied = r.apply_snapshot(snapshot(&[(1, 2, 3)])).unwrap();
        assert_eq!(applied.superseded, vec![ticket.edit_id]);
        assert_eq!(applied.rows.len(), 1);
    }

    #[test]
    fn snapshot_for_other_topic_is_refused() {
        let mut r = reconciler();
        let other = Snapshot::empty(Topic::Teams);
        assert!(matches!(r.apply_snapshot(other), Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn expiry() {
        let mut r = reconciler();
        r.apply_local_edit(1, "team_1_goals", FieldValue::Integer(4), 1_000)
            .unwrap();
        r.apply_local_edit(2, "team_1_goals", FieldValue::Integer(4), 3_000)
            .unwrap();

        assert_eq!(r.next_deadline(5_000), Some(6_000));
        assert!(r.expire(5_999, 5_000).is_empty());

        let expired = r.expire(6_000, 5_000);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].row_key, 1);
        assert_eq!(expired[0].restored_value, json!(2));
        assert_eq!(r.next_deadline(5_000), Some(8_000));
    }

    #[test]
    fn coerce_cell_input() {
        let r = reconciler();
        assert_eq!(r.coerce("team_1_goals", " 3 ").unwrap(), FieldValue::Integer(3));
        assert!(matches!(
            r.coerce("team_1_goals", "three"),
            Err(Error::InvalidValue { .. })
        ));
    }
}
