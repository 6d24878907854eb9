use std::collections::{BTreeMap, BTreeSet};

use fabfruit_core::{DevaluationTable, Phase, TrialKind, TrialRecord};
use rand::Rng;
use tracing::info;

use crate::config::PhasePlan;
use crate::error::Result;
use crate::timeline::build_plan;

/// A full session timeline plus what can be read back out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    pub records: Vec<TrialRecord>,
    /// Distinct boxes shown.
    pub box_count: usize,
    /// Box names devalued at each block, for the SOA/DD phases present.
    pub devaluations: DevaluationTable,
}

impl Design {
    pub fn generate<R: Rng + ?Sized>(plan: &PhasePlan, boxes: usize, rng: &mut R) -> Result<Self> {
        let design = Self::from_records(build_plan(plan, boxes, rng)?);
        info!(
            phases = ?plan.phases(),
            events = design.records.len(),
            boxes = design.box_count,
            "generated design"
        );
        Ok(design)
    }

    /// Summarise a generated or loaded timeline.
    pub fn from_records(records: Vec<TrialRecord>) -> Self {
        let box_count = records
            .iter()
            .filter(|t| t.kind == TrialKind::Show)
            .filter_map(|t| t.lr1.as_deref())
            .collect::<BTreeSet<_>>()
            .len();
        let phases: BTreeSet<Phase> = records
            .iter()
            .map(|t| t.phase)
            .filter(|p| p.is_devaluation())
            .collect();
        let devaluations = phases
            .into_iter()
            .map(|phase| (phase, extract_devalued(&records, phase)))
            .collect();
        Self {
            records,
            box_count,
            devaluations,
        }
    }

    pub fn phases(&self) -> Vec<Phase> {
        let mut phases: Vec<Phase> = Vec::new();
        for t in &self.records {
            if !phases.contains(&t.phase) {
                phases.push(t.phase);
            }
        }
        phases
    }
}

/// Sorted distinct box names flagged devalued on the Show events of each
/// block of `phase`. Blocks without any are left out.
pub fn extract_devalued(records: &[TrialRecord], phase: Phase) -> BTreeMap<usize, Vec<String>> {
    let mut by_block: BTreeMap<usize, BTreeSet<&str>> = BTreeMap::new();
    for t in records
        .iter()
        .filter(|t| t.phase == phase && t.kind == TrialKind::Show && t.deval)
    {
        if let Some(name) = t.lr1.as_deref() {
            by_block.entry(t.block).or_default().insert(name);
        }
    }
    by_block
        .into_iter()
        .map(|(block, names)| (block, names.into_iter().map(str::to_string).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn show(block: usize, name: &str, deval: bool) -> TrialRecord {
        TrialRecord::new(Phase::Soa, TrialKind::Show, block, Some(0), 0.0, 1.0)
            .with_boxes(name, None)
            .devalued(deval)
    }

    #[test]
    fn extracts_per_block_names() {
        let records = vec![show(0, "A", true), show(1, "C", true), show(1, "B", true), show(1, "B", true), show(2, "D", false)];
        let table = extract_devalued(&records, Phase::Soa);
        assert_eq!(
            table,
            BTreeMap::from([(0, vec!["A".to_string()]), (1, vec!["B".to_string(), "C".to_string()])])
        );
        assert!(extract_devalued(&records, Phase::Dd).is_empty());
    }

    #[test]
    fn generated_design_summary() {
        let mut rng = StdRng::seed_from_u64(17);
        let design = Design::generate(&PhasePlan::default(), 6, &mut rng).unwrap();
        assert_eq!(design.box_count, 6);
        assert_eq!(design.phases(), vec![Phase::Id, Phase::Od, Phase::Dd, Phase::Soa]);
        assert_eq!(design.devaluations.keys().copied().collect::<Vec<_>>(), vec![Phase::Soa, Phase::Dd]);
        for blocks in design.devaluations.values() {
            assert_eq!(blocks.len(), 9);
            assert!(blocks.values().all(|names| names.len() == 2));
        }
    }
}
