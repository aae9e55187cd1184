//! Topics: which server table a view is looking at.
//!
//! A topic pairs a record kind with its scope key (round, group). It decides
//! how snapshot rows are keyed and which columns the operator may edit.

use crate::error::{Error, Result};
use crate::schema::FieldRule;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TEAM_COLUMNS: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::team_name("team_name", "team name"),
        FieldRule::day_month("registration_date_ddmm", "registration date"),
    ]
});

static MATCH_RESULT_COLUMNS: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::goals("team_1_goals", "team one goals"),
        FieldRule::goals("team_2_goals", "team two goals"),
    ]
});

/// Tournament round, `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RoundNumber(u8);

impl RoundNumber {
    pub fn new(n: i64) -> Result<Self> {
        match n {
            1..=3 => Ok(Self(n as u8)),
            _ => Err(Error::InvalidRound(n)),
        }
    }

    pub fn get(self) -> i64 {
        i64::from(self.0)
    }
}

impl TryFrom<i64> for RoundNumber {
    type Error = Error;

    fn try_from(n: i64) -> Result<Self> {
        Self::new(n)
    }
}

impl From<RoundNumber> for i64 {
    fn from(round: RoundNumber) -> Self {
        round.get()
    }
}

impl std::fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group within a round, `1..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct GroupNumber(u8);

impl GroupNumber {
    pub fn new(n: i64) -> Result<Self> {
        match n {
            1..=2 => Ok(Self(n as u8)),
            _ => Err(Error::InvalidGroup(n)),
        }
    }

    pub fn get(self) -> i64 {
        i64::from(self.0)
    }
}

impl TryFrom<i64> for GroupNumber {
    type Error = Error;

    fn try_from(n: i64) -> Result<Self> {
        Self::new(n)
    }
}

impl From<GroupNumber> for i64 {
    fn from(group: GroupNumber) -> Self {
        group.get()
    }
}

impl std::fmt::Display for GroupNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One push subscription: a record kind plus its scope key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topic {
    /// Team rankings for one group of one round (read-only)
    Rankings {
        round: RoundNumber,
        group: GroupNumber,
    },
    /// Match results of one round
    MatchResults { round: RoundNumber },
    /// All registered teams
    Teams,
}

impl Topic {
    /// The snapshot column holding each row's key.
    pub fn key_field(&self) -> &'static str {
        match self {
            Topic::Rankings { .. } | Topic::Teams => "team_id",
            Topic::MatchResults { .. } => "match_id",
        }
    }

    /// Rules for the columns the operator may edit.
    pub fn editable_columns(&self) -> &'static [FieldRule] {
        match self {
            Topic::Rankings { .. } => &[],
            Topic::MatchResults { .. } => &MATCH_RESULT_COLUMNS,
            Topic::Teams => &TEAM_COLUMNS,
        }
    }

    /// Get the rule for an editable column.
    pub fn column_rule(&self, field: &str) -> Result<&'static FieldRule> {
        self.editable_columns()
            .iter()
            .find(|rule| rule.name == field)
            .ok_or_else(|| Error::NotEditable(field.to_string()))
    }

    /// Path segment identifying this topic, e.g. `rankings/1/2`.
    pub fn path(&self) -> String {
        match self {
            Topic::Rankings { round, group } => format!("rankings/{}/{}", round, group),
            Topic::MatchResults { round } => format!("match_results/{}", round),
            Topic::Teams => "teams".to_string(),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
