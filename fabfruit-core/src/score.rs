use std::fmt;

use crate::phase::Phase;
use crate::roster::DevalMap;
use crate::stimulus::Direction;

/// Points for a single choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Score {
    /// Opened a devalued box.
    Penalty,
    Nothing,
    /// Opened a valued box the right way.
    Reward,
}

impl Score {
    pub fn points(self) -> i32 {
        match self {
            Score::Penalty => -1,
            Score::Nothing => 0,
            Score::Reward => 1,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.points())
    }
}

/// Score a choice without knowing which block it came from.
///
/// A devalued box can only cost a point, a valued one can only earn one.
/// No choice is never penalised.
pub fn score_raw(direction: Direction, choice: Option<Direction>, devalued: bool) -> Score {
    match choice {
        None => Score::Nothing,
        Some(choice) if choice != direction => Score::Nothing,
        Some(_) if devalued => Score::Penalty,
        Some(_) => Score::Reward,
    }
}

/// Score a choice on a box opening towards `direction`, shown during
/// `block` of `phase`. Only SOA and DD consult the devaluation map.
pub fn score(
    phase: Phase,
    block: usize,
    devalued: &DevalMap,
    direction: Direction,
    choice: Option<Direction>,
) -> Score {
    let is_devalued = phase.is_devaluation()
        && devalued
            .get(&phase)
            .is_some_and(|blocks| blocks.contains(&block));
    score_raw(direction, choice, is_devalued)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use Direction::*;

    fn soa_at(block: usize) -> DevalMap {
        DevalMap::from([(Phase::Soa, BTreeSet::from([block]))])
    }

    #[test]
    fn raw_scores() {
        assert_eq!(score_raw(Left, Some(Left), false), Score::Reward);
        assert_eq!(score_raw(Left, Some(Left), true), Score::Penalty);
        assert_eq!(score_raw(Left, Some(Right), true), Score::Nothing);
        assert_eq!(score_raw(Left, Some(Right), false), Score::Nothing);
        assert_eq!(score_raw(Left, None, true), Score::Nothing);
    }

    #[test]
    fn devalued_block_penalises_opening() {
        let deval = soa_at(1);
        assert_eq!(score(Phase::Soa, 1, &deval, Left, Some(Left)).points(), -1);
        assert_eq!(score(Phase::Soa, 1, &deval, Left, Some(Right)).points(), 0);
        assert_eq!(score(Phase::Soa, 3, &deval, Left, Some(Left)).points(), 1);
        assert_eq!(score(Phase::Soa, 3, &deval, Left, None).points(), 0);
    }

    #[test]
    fn other_phases_ignore_devaluation() {
        let deval = soa_at(1);
        assert_eq!(score(Phase::Id, 1, &deval, Left, Some(Left)), Score::Reward);
        assert_eq!(score(Phase::Id, 1, &deval, Left, Some(Right)), Score::Nothing);
        assert_eq!(score(Phase::Od, 1, &deval, Left, Some(Left)), Score::Reward);
        // DD block 1 is valued: only SOA was devalued there.
        assert_eq!(score(Phase::Dd, 1, &deval, Left, Some(Left)), Score::Reward);
    }

    #[test]
    fn no_choice_is_always_zero() {
        let deval = soa_at(0);
        for phase in Phase::SEQUENCE {
            for dir in Direction::ALL {
                assert_eq!(score(phase, 0, &deval, dir, None), Score::Nothing);
            }
        }
    }

    #[test]
    fn devalued_never_rewards() {
        let deval = DevalMap::from([
            (Phase::Soa, BTreeSet::from([0, 1, 2])),
            (Phase::Dd, BTreeSet::from([0, 1, 2])),
        ]);
        for phase in [Phase::Soa, Phase::Dd] {
            for block in 0..3 {
                for choice in [Some(Left), Some(Right), None] {
                    assert_ne!(score(phase, block, &deval, Right, choice), Score::Reward);
                }
            }
        }
    }
}
