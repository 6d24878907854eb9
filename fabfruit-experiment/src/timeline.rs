//! Expand phase settings into timed trial events.

use fabfruit_core::{Phase, TrialKind, TrialRecord};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::{BOXES_DEVALUED_PER_BLOCK, FIRST_ONSET, PhasePlan, PhaseSettings};
use crate::devalue::devalued_blocks;
use crate::error::{DesignError, Result};

/// Placeholder box names before fruits are assigned: all left-opening boxes
/// (`L0`, `L1`, ...) then all right-opening ones.
pub fn box_names(boxes: usize) -> Result<Vec<String>> {
    if boxes == 0 || boxes % 2 != 0 {
        return Err(DesignError::OddBoxCount(boxes));
    }
    Ok(['L', 'R']
        .iter()
        .flat_map(|side| (0..boxes / 2).map(move |i| format!("{side}{i}")))
        .collect())
}

/// Every phase of `plan`, in plan order.
pub fn build_plan<R: Rng + ?Sized>(plan: &PhasePlan, boxes: usize, rng: &mut R) -> Result<Vec<TrialRecord>> {
    let mut trials = Vec::new();
    for entry in plan.iter() {
        trials.extend(build_phase(entry.phase, &entry.settings, boxes, rng)?);
    }
    Ok(trials)
}

pub fn build_phase<R: Rng + ?Sized>(
    phase: Phase,
    settings: &PhaseSettings,
    boxes: usize,
    rng: &mut R,
) -> Result<Vec<TrialRecord>> {
    settings.validate(phase)?;
    let trials = match phase {
        Phase::Od => outcome_devaluation(settings, boxes, rng)?,
        _ => blocked(phase, settings, boxes, rng)?,
    };
    debug!(%phase, events = trials.len(), "built timeline");
    Ok(trials)
}

/// `pool` repeated or cut to exactly `len` entries.
fn iti_pool(pool: &[f64], len: usize) -> Vec<f64> {
    pool.iter().copied().cycle().take(len).collect()
}

/// ID, SOA and DD: blocks of every box shown `reps` times in random order.
fn blocked<R: Rng + ?Sized>(
    phase: Phase,
    settings: &PhaseSettings,
    boxes: usize,
    rng: &mut R,
) -> Result<Vec<TrialRecord>> {
    let names = box_names(boxes)?;
    let devalued_at = match (phase.is_devaluation(), settings.devalued_per_box) {
        (true, Some(per_box)) => {
            devalued_blocks(settings.blocks, per_box, boxes, BOXES_DEVALUED_PER_BLOCK, rng)?
        }
        _ => vec![Vec::new(); boxes],
    };

    let per_block = settings.trials_per_block(boxes);
    let mut order: Vec<usize> = (0..settings.reps).flat_map(|_| 0..boxes).collect();
    let mut itis = iti_pool(&settings.itis, per_block);
    let grid_dur = settings.grid_dur.unwrap_or_default();
    let feedback_dur = settings.feedback_dur.unwrap_or_default();

    let mut trials: Vec<TrialRecord> = Vec::new();
    let mut onset = FIRST_ONSET;
    for block in 0..settings.blocks {
        if block == 0 || !settings.combine {
            onset = FIRST_ONSET;
        }

        itis.shuffle(rng);
        order.shuffle(rng);

        if phase.is_devaluation() {
            let devalued: Vec<usize> = (0..boxes).filter(|b| devalued_at[*b].contains(&block)).collect();
            if let [first, second] = devalued[..] {
                trials.push(
                    TrialRecord::new(phase, TrialKind::Grid, block, None, onset, grid_dur)
                        .with_boxes(names[first].clone(), Some(names[second].clone())),
                );
                onset += grid_dur;
            }
        }

        for (trial, &bx) in order.iter().enumerate() {
            let name = &names[bx];
            let show = TrialRecord::new(phase, TrialKind::Show, block, Some(trial), onset, settings.trial_dur)
                .with_boxes(name.clone(), None)
                .devalued(devalued_at[bx].contains(&block))
                .finalize();
            onset = show.end;
            trials.push(show);

            if phase.has_feedback() {
                let fbk = TrialRecord::new(phase, TrialKind::Feedback, block, Some(trial), onset, feedback_dur)
                    .with_boxes(name.clone(), None);
                onset = fbk.end;
                trials.push(fbk);
            }

            let iti = TrialRecord::new(phase, TrialKind::Iti, block, Some(trial), onset, itis[trial])
                .with_boxes(name.clone(), None);
            onset = iti.end;
            trials.push(iti);
        }

        let score = TrialRecord::new(phase, TrialKind::Score, block, None, onset, settings.score_dur);
        onset = score.end;
        trials.push(score);
    }
    Ok(trials)
}

/// OD: every left/right pairing, with either box on top and either the top
/// or the bottom devalued, once per block.
fn outcome_devaluation<R: Rng + ?Sized>(
    settings: &PhaseSettings,
    boxes: usize,
    rng: &mut R,
) -> Result<Vec<TrialRecord>> {
    let names = box_names(boxes)?;
    let (lefts, rights) = names.split_at(boxes / 2);

    // (top devalued, [top, bottom])
    let mut pairs: Vec<(bool, [&String; 2])> = Vec::with_capacity(lefts.len() * rights.len() * 4);
    for left in lefts {
        for right in rights {
            for deval_top in [true, false] {
                for left_first in [true, false] {
                    let shown = if left_first { [left, right] } else { [right, left] };
                    pairs.push((deval_top, shown));
                }
            }
        }
    }
    let mut itis = iti_pool(&settings.itis, pairs.len());

    let mut trials: Vec<TrialRecord> = Vec::new();
    let mut onset = 0.0;
    for block in 0..settings.blocks {
        pairs.shuffle(rng);
        itis.shuffle(rng);
        for (trial, (deval_top, [top, bottom])) in pairs.iter().enumerate() {
            let show = TrialRecord::new(Phase::Od, TrialKind::Show, block, Some(trial), onset, settings.trial_dur)
                .with_boxes(top.as_str(), Some(bottom.to_string()))
                .devalued(*deval_top)
                .finalize();
            let iti = TrialRecord::new(Phase::Od, TrialKind::Iti, block, Some(trial), show.end, itis[trial])
                .with_boxes(top.as_str(), Some(bottom.to_string()));
            onset = iti.end;
            trials.push(show);
            trials.push(iti);
        }
    }
    let last_block = settings.blocks.saturating_sub(1);
    trials.push(TrialRecord::new(Phase::Od, TrialKind::Score, last_block, None, onset, settings.score_dur));
    Ok(trials)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use fabfruit_core::Direction;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn soa() -> PhaseSettings {
        PhaseSettings {
            reps: 2,
            ..PhaseSettings::default_for(Phase::Soa).unwrap()
        }
    }

    fn count_by_block(trials: &[TrialRecord], keep: impl Fn(&TrialRecord) -> bool) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for t in trials.iter().filter(|t| keep(t)) {
            *counts.entry(t.block).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn names_split_by_side() {
        assert_eq!(box_names(6).unwrap(), vec!["L0", "L1", "L2", "R0", "R1", "R2"]);
        assert!(box_names(5).is_err());
        assert!(box_names(0).is_err());
    }

    #[test]
    fn soa_block_structure() {
        let mut rng = StdRng::seed_from_u64(3);
        let trials = build_phase(Phase::Soa, &soa(), 6, &mut rng).unwrap();

        let shows = count_by_block(&trials, |t| t.kind == TrialKind::Show);
        let grids = count_by_block(&trials, |t| t.kind == TrialKind::Grid);
        let devalued = count_by_block(&trials, |t| t.kind == TrialKind::Show && t.deval);
        let scores = count_by_block(&trials, |t| t.kind == TrialKind::Score);
        for block in 0..9 {
            assert_eq!(shows[&block], 12);
            assert_eq!(grids[&block], 1);
            assert_eq!(devalued[&block], 4);
            assert_eq!(scores[&block], 1);
        }
        assert!(!trials.iter().any(|t| t.kind == TrialKind::Feedback));
    }

    #[test]
    fn grid_names_the_devalued_boxes() {
        let mut rng = StdRng::seed_from_u64(11);
        let trials = build_phase(Phase::Dd, &soa(), 6, &mut rng).unwrap();
        for grid in trials.iter().filter(|t| t.kind == TrialKind::Grid) {
            let charted: BTreeSet<&str> = [grid.lr1.as_deref(), grid.lr2.as_deref()].into_iter().flatten().collect();
            let devalued: BTreeSet<&str> = trials
                .iter()
                .filter(|t| t.block == grid.block && t.kind == TrialKind::Show && t.deval)
                .filter_map(|t| t.lr1.as_deref())
                .collect();
            assert_eq!(charted, devalued);
        }
    }

    #[test]
    fn events_are_contiguous() {
        let mut rng = StdRng::seed_from_u64(5);
        let trials = build_phase(Phase::Id, &PhaseSettings::default_for(Phase::Id).unwrap(), 6, &mut rng).unwrap();
        for pair in trials.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!((prev.end - prev.onset - prev.dur).abs() < 1e-9);
            if next.block == prev.block {
                assert!((next.onset - prev.end).abs() < 1e-9, "{prev:?} -> {next:?}");
            } else {
                assert_eq!(next.onset, FIRST_ONSET);
            }
        }
        // show, feedback, iti for each of 12 trials plus the score
        assert_eq!(trials.iter().filter(|t| t.block == 0).count(), 12 * 3 + 1);
        assert_eq!(trials[1].kind, TrialKind::Feedback);
    }

    #[test]
    fn combined_blocks_chain_onsets() {
        let settings = PhaseSettings {
            combine: true,
            ..soa()
        };
        let mut rng = StdRng::seed_from_u64(8);
        let trials = build_phase(Phase::Soa, &settings, 6, &mut rng).unwrap();
        assert_eq!(trials[0].onset, FIRST_ONSET);
        for pair in trials.windows(2) {
            assert!((pair[1].onset - pair[0].end).abs() < 1e-9);
        }
    }

    #[test]
    fn every_iti_comes_from_the_pool() {
        let mut rng = StdRng::seed_from_u64(9);
        let settings = soa();
        let trials = build_phase(Phase::Soa, &settings, 6, &mut rng).unwrap();
        let mut per_block: Vec<f64> = trials
            .iter()
            .filter(|t| t.block == 4 && t.kind == TrialKind::Iti)
            .map(|t| t.dur)
            .collect();
        per_block.sort_by(f64::total_cmp);
        assert_eq!(per_block, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 5.0, 5.0]);
    }

    #[test]
    fn od_covers_every_combination() {
        let mut rng = StdRng::seed_from_u64(21);
        let settings = PhaseSettings::default_for(Phase::Od).unwrap();
        let trials = build_phase(Phase::Od, &settings, 6, &mut rng).unwrap();
        let shows: Vec<&TrialRecord> = trials.iter().filter(|t| t.kind == TrialKind::Show).collect();
        assert_eq!(shows.len(), 36);

        let distinct: BTreeSet<(String, String, bool)> = shows
            .iter()
            .map(|t| (t.lr1.clone().unwrap(), t.lr2.clone().unwrap(), t.deval))
            .collect();
        assert_eq!(distinct.len(), 36);

        let mut buckets: BTreeMap<(Direction, bool), usize> = BTreeMap::new();
        for show in &shows {
            *buckets.entry((show.primary_side().unwrap(), show.deval)).or_insert(0) += 1;
        }
        assert_eq!(buckets.len(), 4);
        assert!(buckets.values().all(|n| *n == 9), "{buckets:?}");

        assert_eq!(trials.last().unwrap().kind, TrialKind::Score);
        assert_eq!(trials.iter().filter(|t| t.kind == TrialKind::Score).count(), 1);
        assert_eq!(trials[0].onset, 0.0);
    }

    #[test]
    fn od_devalued_top_flips_correct_side() {
        let mut rng = StdRng::seed_from_u64(4);
        let settings = PhaseSettings::default_for(Phase::Od).unwrap();
        for show in build_phase(Phase::Od, &settings, 6, &mut rng)
            .unwrap()
            .iter()
            .filter(|t| t.kind == TrialKind::Show)
        {
            let top = show.primary_side().unwrap();
            let expected = if show.deval { top.opposite() } else { top };
            assert_eq!(show.cor_side, Some(expected));
        }
    }

    #[test]
    fn plan_keeps_phase_order() {
        let mut rng = StdRng::seed_from_u64(2);
        let trials = build_plan(&PhasePlan::default(), 6, &mut rng).unwrap();
        let mut seen: Vec<Phase> = Vec::new();
        for t in &trials {
            if seen.last() != Some(&t.phase) {
                seen.push(t.phase);
            }
        }
        assert_eq!(seen, vec![Phase::Id, Phase::Od, Phase::Dd, Phase::Soa]);
        let soa_shows = trials.iter().filter(|t| t.phase == Phase::Soa && t.kind == TrialKind::Show).count();
        assert_eq!(soa_shows, 108);
    }

    #[test]
    fn same_seed_same_timeline() {
        let plan = PhasePlan::default();
        let a = build_plan(&plan, 6, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = build_plan(&plan, 6, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }
}
