use std::path::Path;

use fabfruit_core::Phase;
use serde::{Deserialize, Serialize};

use crate::error::{DesignError, Result};

/// Onset of the first event of a block, leaving room for a fixation.
pub const FIRST_ONSET: f64 = 3.0;

/// SOA and DD grids always chart exactly two devalued boxes.
pub const BOXES_DEVALUED_PER_BLOCK: usize = 2;

pub const DEFAULT_BOX_COUNT: usize = 6;

/// Timing and repetition settings for one phase. Durations are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseSettings {
    pub blocks: usize,
    /// Times each box is shown per block.
    pub reps: usize,
    #[serde(alias = "dur")]
    pub trial_dur: f64,
    /// Pool of inter-trial intervals, cycled to the block length and
    /// shuffled.
    pub itis: Vec<f64>,
    /// ID only.
    #[serde(alias = "fbk")]
    pub feedback_dur: Option<f64>,
    /// SOA/DD only.
    #[serde(alias = "grid")]
    pub grid_dur: Option<f64>,
    #[serde(alias = "score")]
    pub score_dur: f64,
    /// SOA/DD only: blocks each box spends devalued.
    #[serde(alias = "ndevalblocks")]
    pub devalued_per_box: Option<usize>,
    /// Chain block onsets instead of restarting each at [`FIRST_ONSET`],
    /// for uninterrupted scanner runs.
    pub combine: bool,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            blocks: 1,
            reps: 1,
            trial_dur: 1.0,
            itis: vec![1.0],
            feedback_dur: None,
            grid_dur: None,
            score_dur: 1.0,
            devalued_per_box: None,
            combine: false,
        }
    }
}

impl PhaseSettings {
    /// Settings the task ships with.
    pub fn default_for(phase: Phase) -> Option<Self> {
        let devaluation = PhaseSettings {
            blocks: 9,
            reps: 2,
            trial_dur: 1.0,
            itis: vec![1.0, 1.0, 1.0, 2.0, 2.0, 5.0],
            score_dur: 1.0,
            grid_dur: Some(5.0),
            devalued_per_box: Some(3),
            ..Default::default()
        };
        match phase {
            Phase::Id => Some(PhaseSettings {
                blocks: 6,
                reps: 2,
                trial_dur: 1.0,
                itis: vec![0.5],
                feedback_dur: Some(1.0),
                score_dur: 2.0,
                ..Default::default()
            }),
            Phase::Od => Some(PhaseSettings {
                trial_dur: 1.0,
                itis: vec![1.0],
                score_dur: 2.0,
                ..Default::default()
            }),
            Phase::Soa | Phase::Dd => Some(devaluation),
            Phase::Survey => None,
        }
    }

    pub fn validate(&self, phase: Phase) -> Result<()> {
        let fail = |reason: &str| Err(DesignError::settings(phase, reason));
        if phase == Phase::Survey {
            return fail("survey has no timed trials");
        }
        if self.blocks == 0 {
            return fail("need at least one block");
        }
        if phase != Phase::Od && self.reps == 0 {
            return fail("need at least one repetition per box");
        }
        if self.itis.is_empty() {
            return fail("iti pool is empty");
        }
        let durations = [Some(self.trial_dur), Some(self.score_dur), self.feedback_dur, self.grid_dur];
        if durations
            .iter()
            .flatten()
            .chain(&self.itis)
            .any(|d| !d.is_finite() || *d < 0.0)
        {
            return fail("durations must be finite and not negative");
        }
        if phase.has_feedback() && self.feedback_dur.is_none() {
            return fail("feedback duration (fbk) is required");
        }
        if phase.is_devaluation() {
            if self.grid_dur.is_none() {
                return fail("grid duration is required");
            }
            if self.devalued_per_box.is_none() {
                return fail("devalued blocks per box (ndevalblocks) is required");
            }
        }
        Ok(())
    }

    /// Number of Show events in one block.
    pub fn trials_per_block(&self, boxes: usize) -> usize {
        self.reps * boxes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub phase: Phase,
    #[serde(default)]
    pub settings: PhaseSettings,
}

/// Ordered, validated phase settings for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PhaseEntry>", into = "Vec<PhaseEntry>")]
pub struct PhasePlan {
    entries: Vec<PhaseEntry>,
}

impl Default for PhasePlan {
    fn default() -> Self {
        let entries = [Phase::Id, Phase::Od, Phase::Dd, Phase::Soa]
            .into_iter()
            .filter_map(|phase| {
                PhaseSettings::default_for(phase).map(|settings| PhaseEntry { phase, settings })
            })
            .collect();
        Self { entries }
    }
}

impl PhasePlan {
    pub fn new(entries: Vec<PhaseEntry>) -> Result<Self> {
        for entry in &entries {
            entry.settings.validate(entry.phase)?;
        }
        Ok(Self { entries })
    }

    pub fn single(phase: Phase, settings: PhaseSettings) -> Result<Self> {
        Self::new(vec![PhaseEntry { phase, settings }])
    }

    /// One phase with its shipped settings.
    pub fn default_only(phase: Phase) -> Result<Self> {
        let settings = PhaseSettings::default_for(phase)
            .ok_or_else(|| DesignError::settings(phase, "no default settings"))?;
        Self::single(phase, settings)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DesignError::io(path, e))?;
        Self::from_json_str(&text)
    }

    pub fn get(&self, phase: Phase) -> Option<&PhaseSettings> {
        self.entries
            .iter()
            .find(|entry| entry.phase == phase)
            .map(|entry| &entry.settings)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseEntry> {
        self.entries.iter()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.entries.iter().map(|entry| entry.phase).collect()
    }
}

impl TryFrom<Vec<PhaseEntry>> for PhasePlan {
    type Error = DesignError;

    fn try_from(entries: Vec<PhaseEntry>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<PhasePlan> for Vec<PhaseEntry> {
    fn from(plan: PhasePlan) -> Self {
        plan.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_valid() {
        let plan = PhasePlan::default();
        assert_eq!(plan.phases(), vec![Phase::Id, Phase::Od, Phase::Dd, Phase::Soa]);
        for entry in plan.iter() {
            entry.settings.validate(entry.phase).unwrap();
        }
        assert_eq!(plan.get(Phase::Soa).unwrap().devalued_per_box, Some(3));
        assert!(plan.get(Phase::Survey).is_none());
    }

    #[test]
    fn reads_short_keys() {
        let plan = PhasePlan::from_json_str(
            r#"[{"phase": "DD", "settings": {
                "blocks": 9, "reps": 2, "itis": [1, 1, 1, 2, 2, 5],
                "grid": 5.0, "dur": 1.5, "score": 2, "ndevalblocks": 3}}]"#,
        )
        .unwrap();
        let dd = plan.get(Phase::Dd).unwrap();
        assert_eq!(dd.trial_dur, 1.5);
        assert_eq!(dd.score_dur, 2.0);
        assert_eq!(dd.grid_dur, Some(5.0));
        assert!(!dd.combine);
    }

    #[test]
    fn rejects_incomplete_settings() {
        let err = PhasePlan::from_json_str(r#"[{"phase": "SOA", "settings": {"blocks": 9}}]"#).unwrap_err();
        assert!(err.to_string().contains("grid"), "{err}");

        let no_fbk = PhaseSettings {
            feedback_dur: None,
            ..PhaseSettings::default_for(Phase::Id).unwrap()
        };
        assert!(matches!(
            PhasePlan::single(Phase::Id, no_fbk),
            Err(DesignError::InvalidSettings { phase: Phase::Id, .. })
        ));
        assert!(PhasePlan::default_only(Phase::Survey).is_err());
    }

    #[test]
    fn rejects_negative_durations() {
        let settings = PhaseSettings {
            itis: vec![1.0, -2.0],
            ..PhaseSettings::default_for(Phase::Od).unwrap()
        };
        assert!(settings.validate(Phase::Od).is_err());
    }
}
