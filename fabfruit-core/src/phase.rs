use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Experimental phases, each with its own trial structure and scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Phase {
    /// Identity learning, with feedback after every choice.
    Id,
    /// Outcome devaluation: two boxes at once, one of them devalued.
    Od,
    /// Slips of action: grid of devalued outside labels per block.
    Soa,
    /// Like SOA but the grid shows the inside (outcome) fruit.
    Dd,
    /// Post-task recall and confidence questions. Never scored.
    Survey,
}

/// Canonical labels shared by every reader and writer.
const PHASE_LABELS: [(Phase, &str); 5] = [
    (Phase::Id, "ID"),
    (Phase::Od, "OD"),
    (Phase::Soa, "SOA"),
    (Phase::Dd, "DD"),
    (Phase::Survey, "SURVEY"),
];

impl Phase {
    pub const SEQUENCE: [Phase; 5] = [Phase::Id, Phase::Od, Phase::Soa, Phase::Dd, Phase::Survey];

    pub fn as_str(self) -> &'static str {
        PHASE_LABELS
            .iter()
            .find(|(phase, _)| *phase == self)
            .map(|(_, label)| *label)
            .unwrap_or("")
    }

    /// Phase that follows this one when a session runs the whole task.
    pub fn next(self) -> Option<Phase> {
        use Phase::*;
        Some(match self {
            Id => Od,
            Od => Soa,
            Soa => Dd,
            Dd => Survey,
            Survey => return None,
        })
    }

    /// SOA and DD devalue whole boxes for whole blocks.
    pub fn is_devaluation(self) -> bool {
        matches!(self, Phase::Soa | Phase::Dd)
    }

    pub fn has_feedback(self) -> bool {
        matches!(self, Phase::Id)
    }

    pub fn is_scored(self) -> bool {
        !matches!(self, Phase::Survey)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().trim_start_matches("PhaseType.");
        PHASE_LABELS
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(label))
            .map(|(phase, _)| *phase)
            .ok_or_else(|| CoreError::UnknownLabel {
                kind: "phase",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for Phase {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Phase> for &'static str {
    fn from(phase: Phase) -> Self {
        phase.as_str()
    }
}
