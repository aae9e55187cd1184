//! Snapshots - the server's authoritative table for one topic.
//!
//! A snapshot always replaces the previous one wholesale. Row order is the
//! server's; [`sorted_view`] reorders for display without touching it.

use crate::error::{Error, Result};
use crate::{RowKey, Topic};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// One table row: its key plus every column the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub key: RowKey,
    pub values: Map<String, Value>,
}

impl Row {
    pub fn new(key: RowKey, values: Map<String, Value>) -> Self {
        Self { key, values }
    }

    /// Get a column value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a column value, returning the previous one.
    pub fn set(&mut self, field: &str, value: Value) -> Option<Value> {
        self.values.insert(field.to_string(), value)
    }
}

/// Authoritative table state for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub topic: Topic,
    pub rows: Vec<Row>,
}

impl Snapshot {
    pub fn new(topic: Topic, rows: Vec<Row>) -> Self {
        Self { topic, rows }
    }

    /// An empty table for a topic.
    pub fn empty(topic: Topic) -> Self {
        Self::new(topic, Vec::new())
    }

    /// Decode a snapshot document (an HTTP body or one push frame).
    pub fn decode(topic: Topic, text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        Self::from_value(topic, value)
    }

    /// Build a snapshot from an already parsed document.
    pub fn from_value(topic: Topic, value: Value) -> Result<Self> {
        let rows = match topic {
            Topic::Rankings { group, .. } => {
                let document = unwrap_field(value, "results");
                let groups = take_array(document, "group_rankings")?;
                let selected = groups.into_iter().find(|g| {
                    g.get("group_number").and_then(Value::as_i64) == Some(group.get())
                });
                match selected {
                    Some(g) => take_array(g, "team_rankings")?
                        .into_iter()
                        .map(|row| ranking_row(topic, row))
                        .collect::<Result<Vec<_>>>()?,
                    None => Vec::new(),
                }
            }
            Topic::MatchResults { .. } => take_array(value, "match_results")?
                .into_iter()
                .map(|row| keyed_row(topic, row))
                .collect::<Result<Vec<_>>>()?,
            Topic::Teams => {
                let rows = match value {
                    Value::Array(rows) => rows,
                    other => take_array(other, "teams")?,
                };
                rows.into_iter()
                    .map(|row| keyed_row(topic, row))
                    .collect::<Result<Vec<_>>>()?
            }
        };
        Ok(Self { topic, rows })
    }

    /// Get a row by key.
    pub fn row(&self, key: RowKey) -> Option<&Row> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Get one cell.
    pub fn value(&self, key: RowKey, field: &str) -> Option<&Value> {
        self.row(key).and_then(|r| r.get(field))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn unwrap_field(value: Value, field: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(field) => map.remove(field).unwrap_or_default(),
        other => other,
    }
}

fn take_array(value: Value, field: &str) -> Result<Vec<Value>> {
    match value {
        Value::Object(mut map) => match map.remove(field) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(Error::InvalidSnapshot(format!("'{}' is not an array", field))),
            None => Err(Error::InvalidSnapshot(format!("missing '{}'", field))),
        },
        _ => Err(Error::InvalidSnapshot(format!(
            "expected an object with '{}'",
            field
        ))),
    }
}

fn keyed_row(topic: Topic, value: Value) -> Result<Row> {
    let Value::Object(values) = value else {
        return Err(Error::InvalidSnapshot("row is not an object".into()));
    };
    let key_field = topic.key_field();
    let key = values
        .get(key_field)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::InvalidSnapshot(format!("row without integer '{}'", key_field)))?;
    Ok(Row::new(key, values))
}

fn ranking_row(topic: Topic, value: Value) -> Result<Row> {
    let mut row = keyed_row(topic, value)?;
    let count = |field: &str| row.get(field).and_then(Value::as_i64).unwrap_or(0);
    let wdl = format!("{}/{}/{}", count("wins"), count("draws"), count("losses"));
    row.set("wdl", Value::String(wdl));
    Ok(row)
}

/// Display order for a column sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Rows reordered by one column, for display only.
///
/// The sort is stable. Integers compare numerically and `DD/MM` dates compare
/// by month, then day. Rows missing the column always sort last.
pub fn sorted_view<'a>(rows: &'a [Row], column: &str, direction: SortDirection) -> Vec<&'a Row> {
    let mut view: Vec<&Row> = rows.iter().collect();
    view.sort_by(|a, b| match (a.get(column), b.get(column)) {
        (Some(x), Some(y)) => {
            let ord = compare_cells(x, y);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    view
}

fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => match (day_month_key(x), day_month_key(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// `DD/MM` as `(month, day)`.
fn day_month_key(s: &str) -> Option<(u32, u32)> {
    let (day, month) = s.split_once('/')?;
    if day.len() != 2 || month.len() != 2 {
        return None;
    }
    Some((month.parse().ok()?, day.parse().ok()?))
}
