//! Run a timeline against a clock and a presentation layer, scoring every
//! response as it comes in.

use std::io::Write;
use std::path::Path;

use fabfruit_core::{Direction, FruitBox, KeyMap, Phase, Roster, Score, TrialKind, TrialRecord};
use fabfruit_timing::{DEFAULT_MAX_WAIT, Timer};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{DesignError, Result};
use crate::survey::{SurveyAnswer, SurveyItem};

/// Fruit names a record puts on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    pub top: Option<String>,
    /// Only OD shows have a second box.
    pub bottom: Option<String>,
}

impl Labels {
    /// DD is cued by the outcome fruit, every other phase by the stimulus.
    pub fn for_record(record: &TrialRecord, roster: &Roster) -> Result<Self> {
        let top = record
            .lr1
            .as_deref()
            .map(|name| find_box(roster, name).map(|bx| cue(bx, record.phase)))
            .transpose()?;
        let bottom = match (record.phase, record.kind, record.lr2.as_deref()) {
            (Phase::Od, TrialKind::Show, Some(name)) => Some(find_box(roster, name)?.stim.name.clone()),
            _ => None,
        };
        Ok(Self { top, bottom })
    }
}

fn cue(bx: &FruitBox, phase: Phase) -> String {
    match phase {
        Phase::Dd => bx.outcome.name.clone(),
        _ => bx.stim.name.clone(),
    }
}

fn find_box<'a>(roster: &'a Roster, name: &str) -> Result<&'a FruitBox> {
    roster
        .find(name)
        .map(|(_, bx)| bx)
        .ok_or_else(|| DesignError::UnknownBox(name.to_string()))
}

/// What came back from showing a box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub fliptime: f64,
    /// Every key seen before the deadline.
    pub keys: Vec<String>,
    pub rt: Option<f64>,
}

/// Keys pressed for one survey question and its confidence rating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyKeys {
    pub answer: Vec<String>,
    pub confidence: Vec<String>,
}

/// The screen side of a session. Times are on the runner's [`Timer`].
pub trait Presenter {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Flip the record's boxes on at `onset` and collect keys until
    /// `deadline`.
    fn present(
        &mut self,
        record: &TrialRecord,
        labels: &Labels,
        onset: f64,
        deadline: f64,
    ) -> std::result::Result<Response, Self::Error>;

    /// Flip a Grid, ITI, Feedback or Score screen at `onset` and return the
    /// flip time. `points` is the preceding show's score for feedback and the
    /// block total for a score screen.
    fn display(
        &mut self,
        record: &TrialRecord,
        labels: &Labels,
        onset: f64,
        points: Option<i32>,
    ) -> std::result::Result<f64, Self::Error>;

    /// The last event of `block` is done.
    fn block_finished(&mut self, _block: usize) -> std::result::Result<(), Self::Error> {
        Ok(())
    }

    fn ask(&mut self, item: &SurveyItem) -> std::result::Result<SurveyKeys, Self::Error>;
}

/// A timeline row after it ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTrial {
    pub record: TrialRecord,
    pub labels: Labels,
    pub fliptime: f64,
    pub keys: Vec<String>,
    pub side: Option<Direction>,
    pub rt: Option<f64>,
    pub score: Option<Score>,
    pub block_score: Option<i32>,
}

impl ScoredTrial {
    fn new(record: TrialRecord, labels: Labels, fliptime: f64) -> Self {
        Self {
            record,
            labels,
            fliptime,
            keys: Vec::new(),
            side: None,
            rt: None,
            score: None,
            block_score: None,
        }
    }
}

pub struct SessionRunner<'a, T: Timer, P: Presenter> {
    pub timer: T,
    pub presenter: P,
    roster: &'a Roster,
    keys: KeyMap,
    max_wait: f64,
}

impl<'a, T: Timer, P: Presenter> SessionRunner<'a, T, P> {
    pub fn new(timer: T, presenter: P, roster: &'a Roster, keys: KeyMap) -> Self {
        Self {
            timer,
            presenter,
            roster,
            keys,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    pub fn with_max_wait(mut self, max_wait: f64) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Box a show is scored against. A devalued OD top box means the
    /// bottom one should be opened.
    fn scored_box(&self, record: &TrialRecord) -> Result<&'a FruitBox> {
        let name = match (record.phase, record.deval) {
            (Phase::Od, true) => record.lr2.as_deref(),
            _ => record.lr1.as_deref(),
        };
        let name = name.ok_or(DesignError::ShowWithoutBox {
            phase: record.phase,
            block: record.block,
        })?;
        find_box(self.roster, name)
    }

    /// Run every record in order. Onsets are relative to a start time that
    /// is taken at the first record and again whenever onsets go backwards
    /// or hit zero; the block score resets with it.
    pub fn run(&mut self, records: &[TrialRecord]) -> Result<Vec<ScoredTrial>> {
        let labels = records
            .iter()
            .map(|record| Labels::for_record(record, self.roster))
            .collect::<Result<Vec<_>>>()?;

        let mut start = 0.0;
        let mut block_score = 0;
        let mut last_score = None;
        let mut scored = Vec::with_capacity(records.len());

        for (i, (record, labels)) in records.iter().zip(labels).enumerate() {
            let restart = i == 0 || records[i - 1].onset > record.onset || record.onset == 0.0;
            if restart {
                start = self.timer.now();
                block_score = 0;
                info!(start, "new start time, block score reset");
            }

            let onset = start + record.onset;
            debug!(
                phase = %record.phase,
                kind = %record.kind,
                block = record.block,
                trial = ?record.trial,
                lr1 = ?record.lr1,
                deval = record.deval,
                "eta {:.3}s",
                onset - self.timer.now()
            );
            self.timer.wait_until(onset, self.max_wait)?;

            let row = match record.kind {
                TrialKind::Show => {
                    let bx = self.scored_box(record)?;
                    let response = self
                        .presenter
                        .present(record, &labels, onset, onset + record.dur)
                        .map_err(presentation)?;
                    let side = self.keys.choice(&response.keys);
                    let score = bx.score(record.phase, record.block, side);
                    block_score += score.points();
                    last_score = Some(score);
                    info!(
                        scored_as = %bx.name,
                        keys = ?response.keys,
                        side = ?side,
                        points = score.points(),
                        block_score,
                        "response"
                    );
                    ScoredTrial {
                        keys: response.keys,
                        side,
                        rt: response.rt,
                        score: Some(score),
                        ..ScoredTrial::new(record.clone(), labels, response.fliptime)
                    }
                }
                TrialKind::Feedback => {
                    let points = last_score.map(Score::points);
                    let fliptime = self.show(record, &labels, onset, points)?;
                    ScoredTrial::new(record.clone(), labels, fliptime)
                }
                TrialKind::Score => {
                    let fliptime = self.show(record, &labels, onset, Some(block_score))?;
                    info!(block = record.block, block_score, "block scored");
                    ScoredTrial {
                        block_score: Some(block_score),
                        ..ScoredTrial::new(record.clone(), labels, fliptime)
                    }
                }
                TrialKind::Grid | TrialKind::Iti => {
                    let fliptime = self.show(record, &labels, onset, None)?;
                    ScoredTrial::new(record.clone(), labels, fliptime)
                }
            };
            scored.push(row);

            let block_over = records
                .get(i + 1)
                .is_none_or(|next| next.block != record.block || next.phase != record.phase);
            if block_over {
                self.presenter.block_finished(record.block).map_err(presentation)?;
            }
        }
        Ok(scored)
    }

    fn show(&mut self, record: &TrialRecord, labels: &Labels, onset: f64, points: Option<i32>) -> Result<f64> {
        self.presenter
            .display(record, labels, onset, points)
            .map_err(presentation)
    }

    /// Ask every survey question in order. Answers are recorded, never
    /// scored.
    pub fn run_survey(&mut self, items: &[SurveyItem]) -> Result<Vec<SurveyAnswer>> {
        items
            .iter()
            .map(|item| {
                let keys = self.presenter.ask(item).map_err(presentation)?;
                let answer = item.answer(&keys.answer, &keys.confidence, &self.keys);
                debug!(?answer, "survey answer");
                Ok(answer)
            })
            .collect()
    }
}

fn presentation<E: std::error::Error + Send + Sync + 'static>(e: E) -> DesignError {
    DesignError::Presentation(Box::new(e))
}

/// Output row: the timing columns followed by what happened.
#[derive(Serialize)]
struct Row<'a> {
    phase: Phase,
    ttype: TrialKind,
    blocknum: usize,
    trial: i64,
    #[serde(rename = "LR1")]
    lr1: Option<&'a str>,
    deval: &'static str,
    #[serde(rename = "LR2")]
    lr2: Option<&'a str>,
    onset: f64,
    dur: f64,
    end: f64,
    cor_side: Option<char>,
    top: Option<&'a str>,
    bottom: Option<&'a str>,
    fliptime: f64,
    resp: Option<String>,
    side: Option<&'static str>,
    rt: Option<f64>,
    score: Option<i32>,
    block_score: Option<i32>,
}

impl<'a> From<&'a ScoredTrial> for Row<'a> {
    fn from(t: &'a ScoredTrial) -> Self {
        let r = &t.record;
        Row {
            phase: r.phase,
            ttype: r.kind,
            blocknum: r.block,
            trial: r.trial.map_or(-1, |i| i as i64),
            lr1: r.lr1.as_deref(),
            deval: if r.deval { "True" } else { "False" },
            lr2: r.lr2.as_deref(),
            onset: r.onset,
            dur: r.dur,
            end: r.end,
            cor_side: r.cor_side.map(Direction::code),
            top: t.labels.top.as_deref(),
            bottom: t.labels.bottom.as_deref(),
            fliptime: t.fliptime,
            resp: (!t.keys.is_empty()).then(|| t.keys.join(",")),
            side: t.side.map(Direction::as_str),
            rt: t.rt,
            score: t.score.map(Score::points),
            block_score: t.block_score,
        }
    }
}

pub fn write_scored<W: Write>(writer: W, rows: &[ScoredTrial]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(Row::from(row))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_session(path: &Path, rows: &[ScoredTrial]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| DesignError::io(path, e))?;
    write_scored(file, rows)?;
    info!(path = %path.display(), rows = rows.len(), "wrote session");
    Ok(())
}

pub fn write_survey<W: Write>(writer: W, answers: &[SurveyAnswer]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for answer in answers {
        csv.serialize(answer)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}
