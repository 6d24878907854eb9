use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::phase::Phase;
use crate::score::{self, Score};
use crate::stimulus::{Direction, Fruit, Role};

/// Blocks at which a single box is devalued, per phase. Only SOA and DD
/// ever populate it.
pub type DevalMap = BTreeMap<Phase, BTreeSet<usize>>;

/// Names of the boxes devalued at each block number, per phase.
pub type DevaluationTable = BTreeMap<Phase, BTreeMap<usize, Vec<String>>>;

/// Index of a box in its [`Roster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(pub usize);

/// A box with a stimulus fruit on the outside and an outcome fruit inside.
/// Opens from a fixed side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FruitBox {
    /// Side letter plus per-side counter, `L0` to `R2` for six boxes.
    pub name: String,
    pub stim: Fruit,
    pub outcome: Fruit,
    pub direction: Direction,
    pub devalued_blocks: DevalMap,
}

impl FruitBox {
    pub fn is_devalued(&self, phase: Phase, block: usize) -> bool {
        phase.is_devaluation()
            && self
                .devalued_blocks
                .get(&phase)
                .is_some_and(|blocks| blocks.contains(&block))
    }

    /// Score a choice made while this box was shown.
    pub fn score(&self, phase: Phase, block: usize, choice: Option<Direction>) -> Score {
        score::score(phase, block, &self.devalued_blocks, self.direction, choice)
    }

    pub fn line(&self) -> BoxLine {
        BoxLine {
            name: self.name.clone(),
            stim: self.stim.name.clone(),
            outcome: self.outcome.name.clone(),
            direction: self.direction,
        }
    }
}

impl fmt::Display for FruitBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.line().fmt(f)
    }
}

/// One line of a box file: `L0: apple -> kiwi (Left)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxLine {
    pub name: String,
    pub stim: String,
    pub outcome: String,
    pub direction: Direction,
}

impl fmt::Display for BoxLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} ({})",
            self.name, self.stim, self.outcome, self.direction
        )
    }
}

impl FromStr for BoxLine {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoreError::MalformedBoxLine(s.to_string());
        let line = s.trim();
        let (name, rest) = line.split_once(':').ok_or_else(malformed)?;
        let (stim, rest) = rest.split_once("->").ok_or_else(malformed)?;
        let (outcome, direction) = rest.trim_end().split_once('(').ok_or_else(malformed)?;
        let direction = direction.strip_suffix(')').ok_or_else(malformed)?;

        let (name, stim, outcome) = (name.trim(), stim.trim(), outcome.trim());
        if [name, stim, outcome].iter().any(|part| part.is_empty() || part.contains(' ')) {
            return Err(malformed());
        }
        let direction = direction.parse().map_err(|_| malformed())?;

        Ok(BoxLine {
            name: name.to_string(),
            stim: stim.to_string(),
            outcome: outcome.to_string(),
            direction,
        })
    }
}

/// Arena owning every box of a session. Fruits point back at their box by
/// [`BoxId`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    boxes: Vec<FruitBox>,
}

impl Roster {
    /// Build boxes from their stim/outcome pairing. Each fruit may appear
    /// in exactly one box and each box name once.
    pub fn from_lines(lines: &[BoxLine], devaluations: &DevaluationTable) -> Result<Self, CoreError> {
        let mut fruit_names = HashSet::new();
        let mut box_names = HashSet::new();
        let mut boxes = Vec::with_capacity(lines.len());

        for (i, line) in lines.iter().enumerate() {
            if !box_names.insert(line.name.as_str()) {
                return Err(CoreError::DuplicateBox(line.name.clone()));
            }
            for fruit in [&line.stim, &line.outcome] {
                if !fruit_names.insert(fruit.as_str()) {
                    return Err(CoreError::DuplicateFruit(fruit.clone()));
                }
            }

            let id = BoxId(i);
            boxes.push(FruitBox {
                name: line.name.clone(),
                stim: Fruit::new(line.stim.clone(), Role::Stim, id),
                outcome: Fruit::new(line.outcome.clone(), Role::Outcome, id),
                direction: line.direction,
                devalued_blocks: DevalMap::new(),
            });
        }

        let mut roster = Roster { boxes };
        roster.set_devaluations(devaluations);
        Ok(roster)
    }

    /// Recompute every box's devalued blocks from a table of box names per
    /// block. Fruit pairing is left as is.
    pub fn set_devaluations(&mut self, devaluations: &DevaluationTable) {
        for bx in &mut self.boxes {
            bx.devalued_blocks = devaluations
                .iter()
                .filter(|(phase, _)| phase.is_devaluation())
                .map(|(phase, blocks)| {
                    let at = blocks
                        .iter()
                        .filter(|(_, names)| names.iter().any(|n| *n == bx.name))
                        .map(|(block, _)| *block)
                        .collect();
                    (*phase, at)
                })
                .collect();
        }
    }

    pub fn boxes(&self) -> &[FruitBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn get(&self, id: BoxId) -> Option<&FruitBox> {
        self.boxes.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<(BoxId, &FruitBox)> {
        self.boxes
            .iter()
            .enumerate()
            .find(|(_, bx)| bx.name == name)
            .map(|(i, bx)| (BoxId(i), bx))
    }

    /// Box a fruit belongs to.
    pub fn owner_of(&self, fruit: &Fruit) -> Option<&FruitBox> {
        self.get(fruit.owner)
    }

    /// All stimulus fruits in box order, then all outcome fruits.
    pub fn fruits(&self) -> impl Iterator<Item = &Fruit> {
        self.boxes
            .iter()
            .map(|bx| &bx.stim)
            .chain(self.boxes.iter().map(|bx| &bx.outcome))
    }

    pub fn fruit(&self, name: &str) -> Option<&Fruit> {
        self.fruits().find(|fruit| fruit.name == name)
    }

    pub fn lines(&self) -> Vec<BoxLine> {
        self.boxes.iter().map(FruitBox::line).collect()
    }
}
