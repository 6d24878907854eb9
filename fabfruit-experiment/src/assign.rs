//! Pair fruits into boxes and keep that pairing stable across visits.

use std::path::Path;

use fabfruit_core::{BoxLine, DevaluationTable, Direction, Roster};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

use crate::error::{DesignError, Result};

pub const BOX_FILE: &str = "boxes.txt";

/// Shuffle fruits and opening sides into `boxes` boxes. Box *i* gets the
/// *i*-th shuffled fruit outside and the *(i + boxes)*-th inside.
pub fn assign_boxes<R: Rng + ?Sized>(
    fruit_names: &[String],
    boxes: usize,
    devaluations: &DevaluationTable,
    rng: &mut R,
) -> Result<Roster> {
    if boxes == 0 || boxes % 2 != 0 {
        return Err(DesignError::OddBoxCount(boxes));
    }
    if fruit_names.len() < 2 * boxes {
        return Err(DesignError::NotEnoughNames {
            needed: 2 * boxes,
            have: fruit_names.len(),
            boxes,
        });
    }

    let mut fruits = fruit_names.to_vec();
    let mut sides: Vec<Direction> = (0..boxes / 2).flat_map(|_| Direction::ALL).collect();
    fruits.shuffle(rng);
    sides.shuffle(rng);

    let mut per_side = [0usize; 2];
    let lines: Vec<BoxLine> = sides
        .iter()
        .enumerate()
        .map(|(i, side)| {
            let counter = &mut per_side[*side as usize];
            let name = format!("{}{}", side.code(), counter);
            *counter += 1;
            BoxLine {
                name,
                stim: fruits[i].clone(),
                outcome: fruits[i + boxes].clone(),
                direction: *side,
            }
        })
        .collect();

    Ok(Roster::from_lines(&lines, devaluations)?)
}

/// Box file text, one `name: stim -> outcome (direction)` line per box.
pub fn save_box_assignment(roster: &Roster) -> String {
    roster.boxes().iter().map(|bx| format!("{bx}\n")).collect()
}

pub fn parse_box_lines(text: &str) -> Result<Vec<BoxLine>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.parse().map_err(|source| DesignError::MalformedBoxLine {
                line_no: i + 1,
                source,
            })
        })
        .collect()
}

/// Rebuild a roster from box file text, taking devalued blocks from the
/// current design.
pub fn load_box_assignment(text: &str, devaluations: &DevaluationTable) -> Result<Roster> {
    Ok(Roster::from_lines(&parse_box_lines(text)?, devaluations)?)
}

pub fn read_box_file(path: &Path, devaluations: &DevaluationTable) -> Result<Roster> {
    let text = std::fs::read_to_string(path).map_err(|e| DesignError::io(path, e))?;
    load_box_assignment(&text, devaluations)
}

/// Write the box file. An existing file must already describe the same
/// boxes: a participant's roster never changes once written.
pub fn save_box_file(path: &Path, roster: &Roster) -> Result<()> {
    let generated = save_box_assignment(roster);
    if path.exists() {
        let existing = std::fs::read_to_string(path).map_err(|e| DesignError::io(path, e))?;
        if parse_box_lines(&existing)? != roster.lines() {
            return Err(DesignError::RosterMismatch {
                path: path.to_path_buf(),
                existing,
                generated,
            });
        }
        return Ok(());
    }
    std::fs::write(path, generated).map_err(|e| DesignError::io(path, e))?;
    info!(path = %path.display(), "saved boxes");
    Ok(())
}

/// Reuse the participant's saved boxes if `dir` has them, otherwise save
/// `generated` there. Returns the roster to run with.
pub fn resume_boxes(dir: &Path, generated: Roster, devaluations: &DevaluationTable) -> Result<Roster> {
    std::fs::create_dir_all(dir).map_err(|e| DesignError::io(dir, e))?;
    let path = dir.join(BOX_FILE);
    let roster = if path.is_file() {
        info!(path = %path.display(), "reading boxes");
        read_box_file(&path, devaluations)?
    } else {
        info!(path = %path.display(), "creating boxes");
        save_box_file(&path, &generated)?;
        generated
    };
    for bx in roster.boxes() {
        info!("{bx}");
    }
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use fabfruit_core::{CoreError, Phase, Role};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("fruit{i}")).collect()
    }

    #[test]
    fn boxes_are_balanced_and_named_by_side() {
        let mut rng = StdRng::seed_from_u64(1);
        let roster = assign_boxes(&names(12), 6, &DevaluationTable::new(), &mut rng).unwrap();
        let box_names: BTreeSet<&str> = roster.boxes().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(box_names, BTreeSet::from(["L0", "L1", "L2", "R0", "R1", "R2"]));
        for bx in roster.boxes() {
            assert_eq!(Some(bx.direction), Direction::from_code(bx.name.chars().next().unwrap()));
            assert_eq!(bx.stim.role, Role::Stim);
            assert_eq!(bx.outcome.role, Role::Outcome);
        }
        assert_eq!(roster.fruits().count(), 12);
    }

    #[test]
    fn devalued_blocks_come_from_the_table() {
        let table = DevaluationTable::from([(
            Phase::Soa,
            BTreeMap::from([(0, vec!["L0".to_string()]), (1, vec!["R0".to_string()]), (2, vec!["L0".to_string()])]),
        )]);
        let mut rng = StdRng::seed_from_u64(1);
        let roster = assign_boxes(&names(4), 2, &table, &mut rng).unwrap();
        let (_, l0) = roster.find("L0").unwrap();
        assert_eq!(l0.devalued_blocks[&Phase::Soa], BTreeSet::from([0, 2]));
        let (_, r0) = roster.find("R0").unwrap();
        assert_eq!(r0.devalued_blocks[&Phase::Soa], BTreeSet::from([1]));
    }

    #[test]
    fn rejects_bad_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            assign_boxes(&names(10), 6, &DevaluationTable::new(), &mut rng),
            Err(DesignError::NotEnoughNames { needed: 12, have: 10, .. })
        ));
        assert!(matches!(
            assign_boxes(&names(12), 3, &DevaluationTable::new(), &mut rng),
            Err(DesignError::OddBoxCount(3))
        ));
    }

    #[test]
    fn box_file_round_trip() {
        let mut rng = StdRng::seed_from_u64(33);
        let roster = assign_boxes(&names(12), 6, &DevaluationTable::new(), &mut rng).unwrap();
        let text = save_box_assignment(&roster);
        assert_eq!(text.lines().count(), 6);

        let back = load_box_assignment(&text, &DevaluationTable::new()).unwrap();
        assert_eq!(back.lines(), roster.lines());
        for fruit in back.fruits() {
            let owner = back.owner_of(fruit).unwrap();
            assert!(owner.stim.name == fruit.name || owner.outcome.name == fruit.name);
        }
    }

    #[test]
    fn malformed_line_is_reported_with_its_number() {
        let text = "L0: apple -> kiwi (Left)\n\nR0 pear fig Right\n";
        match load_box_assignment(text, &DevaluationTable::new()) {
            Err(DesignError::MalformedBoxLine { line_no, source }) => {
                assert_eq!(line_no, 3);
                assert!(matches!(source, CoreError::MalformedBoxLine(_)));
            }
            other => panic!("expected malformed line, got {other:?}"),
        }
    }

    #[test]
    fn resume_reuses_saved_boxes() {
        let dir = tempfile::tempdir().unwrap();
        let first = assign_boxes(&names(12), 6, &DevaluationTable::new(), &mut StdRng::seed_from_u64(12345)).unwrap();
        let saved = resume_boxes(dir.path(), first.clone(), &DevaluationTable::new()).unwrap();
        assert!(dir.path().join(BOX_FILE).is_file());
        assert_eq!(saved, first);

        let other = assign_boxes(&names(12), 6, &DevaluationTable::new(), &mut StdRng::seed_from_u64(54321)).unwrap();
        assert_ne!(other.lines(), first.lines());
        let resumed = resume_boxes(dir.path(), other, &DevaluationTable::new()).unwrap();
        assert_eq!(resumed.lines(), first.lines());
    }

    #[test]
    fn saving_a_different_roster_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(BOX_FILE);
        let first = assign_boxes(&names(12), 6, &DevaluationTable::new(), &mut StdRng::seed_from_u64(1)).unwrap();
        save_box_file(&path, &first).unwrap();
        save_box_file(&path, &first).unwrap();

        let other = assign_boxes(&names(12), 6, &DevaluationTable::new(), &mut StdRng::seed_from_u64(2)).unwrap();
        assert_ne!(other.lines(), first.lines());
        assert!(matches!(
            save_box_file(&path, &other),
            Err(DesignError::RosterMismatch { .. })
        ));
    }
}
