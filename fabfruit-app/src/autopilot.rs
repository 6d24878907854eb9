use std::convert::Infallible;

use fabfruit_core::{Direction, TrialRecord};
use fabfruit_experiment::session::{Labels, Presenter, Response, SurveyKeys};
use fabfruit_experiment::survey::SurveyItem;
use rand::Rng;
use rand::rngs::StdRng;

/// Stand-in participant for dry runs: presses the key for the correct side
/// with probability `accuracy`, and otherwise the wrong key or nothing.
pub struct Autopilot {
    rng: StdRng,
    accuracy: f64,
}

impl Autopilot {
    pub fn new(rng: StdRng, accuracy: f64) -> Self {
        Self {
            rng,
            accuracy: accuracy.clamp(0.0, 1.0),
        }
    }

    fn key(side: Direction) -> String {
        match side {
            Direction::Left => "left".to_string(),
            Direction::Right => "right".to_string(),
        }
    }
}

impl Presenter for Autopilot {
    type Error = Infallible;

    fn present(
        &mut self,
        record: &TrialRecord,
        _labels: &Labels,
        onset: f64,
        deadline: f64,
    ) -> Result<Response, Infallible> {
        let correct = self.rng.random_bool(self.accuracy);
        let keys = match (record.cor_side, correct) {
            (Some(side), true) => vec![Self::key(side)],
            (Some(side), false) => vec![Self::key(side.opposite())],
            // devalued box: the right move is to hold back
            (None, true) => Vec::new(),
            (None, false) => vec![Self::key(record.primary_side().unwrap_or(Direction::Left))],
        };
        let rt = (!keys.is_empty()).then(|| self.rng.random_range(0.2..(deadline - onset).max(0.3)));
        Ok(Response {
            fliptime: onset,
            keys,
            rt,
        })
    }

    fn display(
        &mut self,
        _record: &TrialRecord,
        _labels: &Labels,
        onset: f64,
        _points: Option<i32>,
    ) -> Result<f64, Infallible> {
        Ok(onset)
    }

    fn ask(&mut self, item: &SurveyItem) -> Result<SurveyKeys, Infallible> {
        let answer = match item {
            SurveyItem::Direction { answer, .. } => {
                let side = if self.rng.random_bool(self.accuracy) {
                    *answer
                } else {
                    answer.opposite()
                };
                Self::key(side)
            }
            SurveyItem::Pair { choices, .. } => (self.rng.random_range(0..choices.len()) + 1).to_string(),
        };
        Ok(SurveyKeys {
            answer: vec![answer],
            confidence: vec![self.rng.random_range(1..=5u8).to_string()],
        })
    }
}
