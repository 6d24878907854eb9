use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::phase::Phase;
use crate::stimulus::Direction;

/// Discrete events a block is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum TrialKind {
    /// Chart of the boxes devalued for the coming block (SOA/DD).
    Grid,
    /// A box (or two, in OD) waiting for a response.
    Show,
    /// Opened box with the points earned (ID).
    Feedback,
    /// Inter-trial interval.
    Iti,
    /// Block total.
    Score,
}

const TRIAL_KIND_LABELS: [(TrialKind, &str); 5] = [
    (TrialKind::Grid, "GRID"),
    (TrialKind::Show, "SHOW"),
    (TrialKind::Feedback, "FBK"),
    (TrialKind::Iti, "ITI"),
    (TrialKind::Score, "SCORE"),
];

impl TrialKind {
    pub fn as_str(self) -> &'static str {
        TRIAL_KIND_LABELS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, label)| *label)
            .unwrap_or("")
    }
}

impl fmt::Display for TrialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().trim_start_matches("TrialType.");
        TRIAL_KIND_LABELS
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(label))
            .map(|(kind, _)| *kind)
            .ok_or_else(|| CoreError::UnknownLabel {
                kind: "trial type",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for TrialKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TrialKind> for &'static str {
    fn from(kind: TrialKind) -> Self {
        kind.as_str()
    }
}

/// One timed event of a session. This is also the row format of a timing
/// file: `phase,ttype,blocknum,trial,LR1,deval,LR2,onset,dur,end,cor_side`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub phase: Phase,
    #[serde(rename = "ttype")]
    pub kind: TrialKind,
    #[serde(rename = "blocknum")]
    pub block: usize,
    /// Position within the block. Grid and Score events have none.
    #[serde(with = "trial_index")]
    pub trial: Option<usize>,
    /// Box shown (top box for OD).
    #[serde(rename = "LR1", default)]
    pub lr1: Option<String>,
    /// For OD: whether the top box is devalued. Otherwise whether `lr1` is.
    #[serde(with = "flag", default)]
    pub deval: bool,
    /// Bottom box for OD, second devalued box on a Grid.
    #[serde(rename = "LR2", default)]
    pub lr2: Option<String>,
    pub onset: f64,
    pub dur: f64,
    pub end: f64,
    #[serde(with = "side_code", default)]
    pub cor_side: Option<Direction>,
}

impl TrialRecord {
    pub fn new(phase: Phase, kind: TrialKind, block: usize, trial: Option<usize>, onset: f64, dur: f64) -> Self {
        Self {
            phase,
            kind,
            block,
            trial,
            lr1: None,
            deval: false,
            lr2: None,
            onset,
            dur,
            end: onset + dur,
            cor_side: None,
        }
    }

    pub fn with_boxes(mut self, lr1: impl Into<String>, lr2: Option<String>) -> Self {
        self.lr1 = Some(lr1.into());
        self.lr2 = lr2;
        self
    }

    pub fn devalued(mut self, deval: bool) -> Self {
        self.deval = deval;
        self
    }

    /// Side encoded in the first letter of `lr1`.
    pub fn primary_side(&self) -> Option<Direction> {
        self.lr1
            .as_deref()
            .and_then(|name| name.chars().next())
            .and_then(Direction::from_code)
    }

    /// Correct side for analysis. Only Show events have one.
    ///
    /// A devalued OD top box means the bottom, opposite, box should be
    /// opened. A devalued SOA/DD box has no correct side at all.
    pub fn correct_side(&self) -> Option<Direction> {
        if self.kind != TrialKind::Show {
            return None;
        }
        let side = self.primary_side()?;
        match (self.deval, self.phase) {
            (true, Phase::Od) => Some(side.opposite()),
            (true, phase) if phase.is_devaluation() => None,
            _ => Some(side),
        }
    }

    /// Fill `cor_side` from the other columns.
    pub fn finalize(mut self) -> Self {
        self.cor_side = self.correct_side();
        self
    }
}

/// `-1` in the file means "no trial index".
mod trial_index {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(i) => serializer.serialize_i64(*i as i64),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(usize::try_from(raw).ok())
    }
}

/// Booleans as pandas writes them, `True`/`False`.
mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(D::Error::custom(format!("not a boolean: '{other}'"))),
        }
    }
}

/// `L`, `R` or empty.
mod side_code {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::stimulus::Direction;

    pub fn serialize<S: Serializer>(value: &Option<Direction>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dir) => serializer.serialize_str(dir.code().encode_utf8(&mut [0; 4])),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Direction>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let mut chars = raw.chars();
        match (chars.next().and_then(Direction::from_code), chars.next()) {
            (Some(dir), None) => Ok(Some(dir)),
            _ => Err(D::Error::custom(format!("not a side code: '{raw}'"))),
        }
    }
}
