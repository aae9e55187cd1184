//! Declarative field rules and the generic validator that evaluates them.
//!
//! Rules are data: each record kind has one [`RecordSchema`] listing its
//! fields in positional order, and every check (required, length, pattern,
//! range, calendar day) is a property of a [`FieldRule`]. The same rules back
//! batch lines, live per-keystroke feedback and single-cell table edits.

use crate::{FieldValue, RecordKind};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TEAM_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_ -]*$").expect("team name pattern compiles")
});

static DAY_MONTH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}$").expect("day/month pattern compiles"));

static TEAM_REGISTRATION: LazyLock<RecordSchema> = LazyLock::new(|| RecordSchema {
    kind: RecordKind::TeamRegistration,
    fields: vec![
        FieldRule::team_name("team_name", "team name"),
        FieldRule::day_month("registration_date", "registration date"),
        FieldRule::integer("group_number", "group number").range(
            Some(1),
            Some(2),
            "group number must be either 1 or 2",
        ),
    ],
});

static MATCH_RESULT: LazyLock<RecordSchema> = LazyLock::new(|| RecordSchema {
    kind: RecordKind::MatchResult,
    fields: vec![
        FieldRule::team_name("team_one", "team one name"),
        FieldRule::team_name("team_two", "team two name"),
        FieldRule::goals("goals_one", "team one goals"),
        FieldRule::goals("goals_two", "team two goals"),
    ],
});

/// Leap year used to decide whether a `DD/MM` pair is a real day.
const REFERENCE_LEAP_YEAR: i32 = 1972;

/// Field types supported by the line grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    /// Whole number, parsed without locale rules
    Integer,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Text => write!(f, "Text"),
            FieldType::Integer => write!(f, "Integer"),
        }
    }
}

/// Which constraint a value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Required,
    Type,
    MaxLength,
    Pattern,
    Range,
    CalendarDay,
}

/// A single failed check on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub constraint: Constraint,
    pub message: String,
}

impl Violation {
    fn new(field: &'static str, constraint: Constraint, message: impl Into<String>) -> Self {
        Self {
            field,
            constraint,
            message: message.into(),
        }
    }
}

/// A regex a text field must match, with the message shown when it doesn't.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub regex: &'static Regex,
    pub message: &'static str,
}

/// Inclusive integer bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub message: &'static str,
}

impl NumericRange {
    fn contains(&self, n: i64) -> bool {
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }
}

/// Definition of one field and its constraints.
#[derive(Debug, Clone)]
pub struct FieldRule {
    /// Field name as it appears in diagnostics and request bodies
    pub name: &'static str,
    /// Human label, also used as the `<placeholder>` for missing fields
    pub label: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub range: Option<NumericRange>,
    /// Text must name a real `DD/MM` day
    pub calendar_day: bool,
}

impl FieldRule {
    /// An unconstrained text field.
    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            field_type: FieldType::Text,
            required: false,
            max_length: None,
            pattern: None,
            range: None,
            calendar_day: false,
        }
    }

    /// An unconstrained integer field.
    pub fn integer(name: &'static str, label: &'static str) -> Self {
        Self {
            field_type: FieldType::Integer,
            ..Self::text(name, label)
        }
    }

    /// Team name: non-empty, at most 50 chars, alphanumeric/hyphen/underscore/space.
    pub fn team_name(name: &'static str, label: &'static str) -> Self {
        Self::text(name, label).required().max_length(50).pattern(
            &TEAM_NAME_PATTERN,
            "team name can only contain alphanumeric characters, hyphens, underscores, and spaces",
        )
    }

    /// `DD/MM` date that exists in the calendar.
    pub fn day_month(name: &'static str, label: &'static str) -> Self {
        Self::text(name, label)
            .required()
            .pattern(
                &DAY_MONTH_PATTERN,
                "registration date needs to adhere to DD/MM format",
            )
            .calendar_day()
    }

    /// Goal count: whole number, never negative.
    pub fn goals(name: &'static str, label: &'static str) -> Self {
        Self::integer(name, label).range(Some(0), None, "cannot be negative")
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, regex: &'static Regex, message: &'static str) -> Self {
        self.pattern = Some(Pattern { regex, message });
        self
    }

    pub fn range(mut self, min: Option<i64>, max: Option<i64>, message: &'static str) -> Self {
        self.range = Some(NumericRange { min, max, message });
        self
    }

    pub fn calendar_day(mut self) -> Self {
        self.calendar_day = true;
        self
    }

    /// Coerce a raw token into this field's type.
    pub fn coerce(&self, token: &str) -> Result<FieldValue, Violation> {
        match self.field_type {
            FieldType::Text => Ok(FieldValue::Text(token.to_string())),
            FieldType::Integer => token.parse::<i64>().map(FieldValue::Integer).map_err(|_| {
                Violation::new(
                    self.name,
                    Constraint::Type,
                    format!("{} must be a whole number", self.label),
                )
            }),
        }
    }

    /// Validate a coerced value against every constraint of this rule.
    pub fn validate(&self, value: &FieldValue) -> Vec<Violation> {
        match (self.field_type, value) {
            (FieldType::Text, FieldValue::Text(s)) => self.validate_text(s),
            (FieldType::Integer, FieldValue::Integer(n)) => self.validate_integer(*n),
            (expected, _) => vec![Violation::new(
                self.name,
                Constraint::Type,
                format!("{} must be {}", self.label, type_phrase(expected)),
            )],
        }
    }

    fn validate_text(&self, s: &str) -> Vec<Violation> {
        if s.is_empty() {
            if self.required {
                return vec![Violation::new(
                    self.name,
                    Constraint::Required,
                    format!("{} is required", self.label),
                )];
            }
            return Vec::new();
        }

        let mut violations = Vec::new();

        if let Some(max) = self.max_length {
            if s.chars().count() > max {
                violations.push(Violation::new(
                    self.name,
                    Constraint::MaxLength,
                    format!("{} is limited to {} char", self.label, max),
                ));
            }
        }

        let mut shape_ok = true;
        if let Some(pattern) = &self.pattern {
            if !pattern.regex.is_match(s) {
                shape_ok = false;
                violations.push(Violation::new(self.name, Constraint::Pattern, pattern.message));
            }
        }

        // Only a well-shaped date can be checked against the calendar.
        if self.calendar_day && shape_ok && !is_calendar_day(s) {
            violations.push(Violation::new(
                self.name,
                Constraint::CalendarDay,
                format!("{} is not valid", self.label),
            ));
        }

        violations
    }

    fn validate_integer(&self, n: i64) -> Vec<Violation> {
        match &self.range {
            Some(range) if !range.contains(n) => {
                vec![Violation::new(self.name, Constraint::Range, range.message)]
            }
            _ => Vec::new(),
        }
    }
}

fn type_phrase(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Text => "text",
        FieldType::Integer => "a whole number",
    }
}

/// Whether `DD/MM` names a real day. Checked against a leap year so `29/02`
/// is accepted.
pub fn is_calendar_day(ddmm: &str) -> bool {
    let Some((day, month)) = ddmm.split_once('/') else {
        return false;
    };
    match (day.parse::<u32>(), month.parse::<u32>()) {
        (Ok(day), Ok(month)) => NaiveDate::from_ymd_opt(REFERENCE_LEAP_YEAR, month, day).is_some(),
        _ => false,
    }
}

/// Schema for one record kind: its fields in positional order.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub kind: RecordKind,
    pub fields: Vec<FieldRule>,
}

impl RecordSchema {
    /// `<team_name> <registration_date> <group_number>`
    pub fn team_registration() -> &'static RecordSchema {
        &TEAM_REGISTRATION
    }

    /// `<team_one> <team_two> <goals_one> <goals_two>`
    pub fn match_result() -> &'static RecordSchema {
        &MATCH_RESULT
    }

    /// Get the built-in schema for a record kind.
    pub fn for_kind(kind: RecordKind) -> &'static RecordSchema {
        match kind {
            RecordKind::TeamRegistration => Self::team_registration(),
            RecordKind::MatchResult => Self::match_result(),
        }
    }

    /// Number of tokens a complete line must have.
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Get a field rule by name.
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate positional values. Only the values present are checked, so a
    /// prefix of a line validates the fields typed so far.
    pub fn validate_values(&self, values: &[FieldValue]) -> Vec<Violation> {
        self.fields
            .iter()
            .zip(values)
            .flat_map(|(rule, value)| rule.validate(value))
            .collect()
    }
}
