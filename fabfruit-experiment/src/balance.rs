//! Reject randomisations where the correct side repeats too often in a row.

use std::collections::BTreeMap;

use fabfruit_core::{Direction, Phase, TrialKind, TrialRecord};
use tracing::debug;

/// Runs bucketed by how many times the previous side repeated: bucket 0 is a
/// singleton, bucket 2 a run of three. The last bucket collects everything
/// longer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounts(pub BTreeMap<usize, usize>);

impl RunCounts {
    pub fn get(&self, bucket: usize) -> usize {
        self.0.get(&bucket).copied().unwrap_or(0)
    }

    fn bump(&mut self, bucket: usize) {
        *self.0.entry(bucket).or_insert(0) += 1;
    }
}

/// Thresholds a block has to meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceRules {
    /// Highest bucket; longer runs land here.
    pub max_bucket: usize,
    /// Repeats after this many events break the run instead of extending it.
    pub reset_every: usize,
    pub max_capped: usize,
    pub max_runs_of_four: usize,
    pub max_runs_of_three: usize,
    /// At least `singleton_base / 4` singletons are required.
    pub singleton_base: usize,
}

impl Default for BalanceRules {
    fn default() -> Self {
        Self {
            max_bucket: 4,
            reset_every: 12,
            max_capped: 1,
            max_runs_of_four: 1,
            max_runs_of_three: 3,
            singleton_base: 7,
        }
    }
}

impl BalanceRules {
    pub fn run_counts<T: PartialEq>(&self, sides: &[T]) -> RunCounts {
        let mut counts = RunCounts(BTreeMap::from([(0, 0)]));
        if sides.len() <= 1 {
            return counts;
        }

        let mut repeats = 0;
        for (i, pair) in sides.windows(2).enumerate() {
            if pair[0] == pair[1] && i < self.reset_every {
                repeats += 1;
            } else {
                counts.bump(repeats.min(self.max_bucket));
                repeats = 0;
            }
        }
        counts.bump(repeats.min(self.max_bucket));
        counts
    }

    pub fn accepts_counts(&self, counts: &RunCounts) -> bool {
        let verdict = if counts.get(self.max_bucket) > self.max_capped {
            Some("too many long runs")
        } else if counts.get(3) > self.max_runs_of_four {
            Some("too many runs of 4")
        } else if counts.get(2) > self.max_runs_of_three {
            Some("too many runs of 3")
        } else if (counts.get(0) as f64) < self.singleton_base as f64 / 4.0 {
            Some("too few singletons")
        } else {
            None
        };
        if let Some(reason) = verdict {
            debug!(counts = ?counts.0, reason, "unbalanced sides");
        }
        verdict.is_none()
    }

    /// Predicate over a sequence of side labels.
    pub fn accepts<T: PartialEq>(&self, sides: &[T]) -> bool {
        self.accepts_counts(&self.run_counts(sides))
    }
}

/// Check every block of every phase, using the side a participant should
/// pick. Devalued SOA/DD boxes have no such side and are skipped.
pub fn timeline_balanced(records: &[TrialRecord], rules: &BalanceRules) -> bool {
    let mut blocks: BTreeMap<(Phase, usize), Vec<Direction>> = BTreeMap::new();
    for record in records.iter().filter(|t| t.kind == TrialKind::Show) {
        if let Some(side) = record.correct_side() {
            blocks.entry((record.phase, record.block)).or_default().push(side);
        }
    }
    blocks.values().all(|sides| rules.accepts(sides))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::PhasePlan;
    use crate::timeline::build_plan;

    fn sides(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn counts_runs() {
        let rules = BalanceRules::default();
        let counts = rules.run_counts(&sides("LRRLLLR"));
        // L, RR, LLL, R
        assert_eq!(counts.get(0), 2);
        assert_eq!(counts.get(1), 1);
        assert_eq!(counts.get(2), 1);
    }

    #[test]
    fn long_runs_are_capped() {
        let rules = BalanceRules::default();
        let counts = rules.run_counts(&sides("LLLLLLLR"));
        assert_eq!(counts.get(4), 1);
        assert_eq!(counts.get(0), 1);
    }

    #[test]
    fn repeats_past_reset_break_runs() {
        let rules = BalanceRules {
            reset_every: 2,
            ..Default::default()
        };
        // the third and fourth repeats fall after the reset point
        let counts = rules.run_counts(&sides("LLLLL"));
        assert_eq!(counts.get(2), 1);
        assert_eq!(counts.get(0), 2);
    }

    #[test]
    fn short_sequences_are_trivial() {
        let rules = BalanceRules::default();
        assert_eq!(rules.run_counts(&sides("L")), RunCounts(BTreeMap::from([(0, 0)])));
    }

    #[test]
    fn judges_sequences() {
        let rules = BalanceRules::default();
        assert!(rules.accepts(&sides("LRLRRLRLLRLR")));
        assert!(!rules.accepts(&sides("LLLLRRRRLLLL")), "three runs of four");
        assert!(!rules.accepts(&sides("LLRRLLRRLLRR")), "no singletons");
        assert!(!rules.accepts(&sides("LLLLRLLLLRLR")), "two runs of four");
    }

    #[test]
    fn filter_finds_balanced_timelines() {
        let plan = PhasePlan::default_only(Phase::Soa).unwrap();
        let rules = BalanceRules::default();
        let found = (0..200u64).any(|seed| {
            let trials = build_plan(&plan, 6, &mut StdRng::seed_from_u64(seed)).unwrap();
            timeline_balanced(&trials, &rules)
        });
        assert!(found);
    }
}
