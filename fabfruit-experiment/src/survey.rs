//! Questions asked after the task: how each box opens, which outside label
//! goes with which inside fruit, and how sure the participant is. Answers
//! are recorded but never scored.

use fabfruit_core::{Direction, FruitBox, KeyMap, Roster, first_key};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::Serialize;

/// Choices offered when matching an outside label to its inside fruit.
pub const PAIR_CHOICES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyItem {
    /// Which way does the box with this fruit on or in it open?
    Direction { fruit: String, answer: Direction },
    /// Which of `choices` is inside the box labelled `stim`?
    Pair {
        stim: String,
        choices: Vec<String>,
        answer: usize,
    },
}

impl SurveyItem {
    /// Whether a direction answer was right. Pair items have no direction.
    pub fn grade_direction(&self, choice: Option<Direction>) -> Option<bool> {
        match self {
            SurveyItem::Direction { answer, .. } => Some(choice == Some(*answer)),
            SurveyItem::Pair { .. } => None,
        }
    }

    /// Whether the picked choice index was right. Direction items have no
    /// choices.
    pub fn grade_pick(&self, pick: Option<usize>) -> Option<bool> {
        match self {
            SurveyItem::Pair { answer, .. } => Some(pick == Some(*answer)),
            SurveyItem::Direction { .. } => None,
        }
    }

    /// Record the keys pressed for this item and for the confidence rating
    /// that follows it.
    pub fn answer<S: AsRef<str>>(&self, keys: &[S], confidence_keys: &[S], keymap: &KeyMap) -> SurveyAnswer {
        let key = first_key(keys);
        let (question, prompt, choices, correct) = match self {
            SurveyItem::Direction { fruit, .. } => (
                "direction",
                fruit.clone(),
                String::new(),
                self.grade_direction(key.and_then(|k| keymap.direction(k))),
            ),
            SurveyItem::Pair { stim, choices, .. } => (
                "pair",
                stim.clone(),
                choices.join(" "),
                self.grade_pick(key.and_then(finger_pick)),
            ),
        };
        SurveyAnswer {
            question,
            prompt,
            choices,
            resp: key.map(str::to_string),
            correct: correct.filter(|_| key.is_some()),
            confidence: first_key(confidence_keys).and_then(confidence),
        }
    }
}

/// One row of the survey output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyAnswer {
    pub question: &'static str,
    pub prompt: String,
    pub choices: String,
    pub resp: Option<String>,
    pub correct: Option<bool>,
    pub confidence: Option<u8>,
}

/// Every fruit's direction question followed by every box's pairing
/// question, each group in random order.
pub fn survey_items<R: Rng + ?Sized>(roster: &Roster, rng: &mut R) -> Vec<SurveyItem> {
    let mut directions: Vec<SurveyItem> = roster
        .boxes()
        .iter()
        .flat_map(|bx| {
            [&bx.stim, &bx.outcome].map(|fruit| SurveyItem::Direction {
                fruit: fruit.name.clone(),
                answer: bx.direction,
            })
        })
        .collect();
    directions.shuffle(rng);

    let mut pairs: Vec<SurveyItem> = roster.boxes().iter().map(|bx| pair_item(roster, bx, rng)).collect();
    pairs.shuffle(rng);

    directions.extend(pairs);
    directions
}

/// The box's outcome plus up to four other outcomes, shuffled.
pub fn pair_item<R: Rng + ?Sized>(roster: &Roster, bx: &FruitBox, rng: &mut R) -> SurveyItem {
    let others: Vec<&str> = roster
        .boxes()
        .iter()
        .filter(|other| other.name != bx.name)
        .map(|other| other.outcome.name.as_str())
        .collect();
    let mut choices: Vec<String> = others
        .choose_multiple(rng, PAIR_CHOICES - 1)
        .map(|name| name.to_string())
        .collect();
    choices.push(bx.outcome.name.clone());
    choices.shuffle(rng);
    let answer = choices.iter().position(|c| *c == bx.outcome.name).unwrap_or_default();
    SurveyItem::Pair {
        stim: bx.stim.name.clone(),
        choices,
        answer,
    }
}

/// Number keys `1`..`5` pick choices 0 to 4.
pub fn finger_pick(key: &str) -> Option<usize> {
    match key.parse::<usize>() {
        Ok(n @ 1..=PAIR_CHOICES) => Some(n - 1),
        _ => None,
    }
}

/// Confidence from a button box key. The thumb (`1`) is most confident.
pub fn confidence(key: &str) -> Option<u8> {
    match key.parse::<u8>() {
        Ok(n @ 1..=5) => Some(5 - n),
        _ => None,
    }
}
