use std::path::PathBuf;

use fabfruit_core::{CoreError, Phase};
use fabfruit_timing::TimingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("invalid {phase} settings: {reason}")]
    InvalidSettings { phase: Phase, reason: String },

    #[error(
        "cannot devalue {boxes} boxes {per_box} times each over {blocks} blocks with {per_block} per block"
    )]
    Infeasible {
        blocks: usize,
        per_box: usize,
        boxes: usize,
        per_block: usize,
    },

    #[error("no valid devaluation draw after {attempts} attempts")]
    DrawExhausted { attempts: usize },

    #[error("box file {} does not match the generated boxes:\n{existing}\nvs\n{generated}", path.display())]
    RosterMismatch {
        path: PathBuf,
        existing: String,
        generated: String,
    },

    #[error("line {line_no} of box file: {source}")]
    MalformedBoxLine {
        line_no: usize,
        #[source]
        source: CoreError,
    },

    #[error("need {needed} fruit names for {boxes} boxes, have {have}")]
    NotEnoughNames { needed: usize, have: usize, boxes: usize },

    #[error("box count must be even and non-zero, got {0}")]
    OddBoxCount(usize),

    #[error("timeline names box '{0}' which is not in the roster")]
    UnknownBox(String),

    #[error("{phase} block {block} has a show event without a box")]
    ShowWithoutBox { phase: Phase, block: usize },

    #[error("seed file {} holds seed {stored}, {requested} was requested", path.display())]
    SeedMismatch {
        path: PathBuf,
        stored: u64,
        requested: u64,
    },

    #[error("seed file {} does not hold a number: '{content}'", path.display())]
    BadSeedFile { path: PathBuf, content: String },

    #[error("cannot take runs {start}..{end} from {available} timing files")]
    RunRange {
        start: usize,
        end: usize,
        available: usize,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error("presentation failed: {0}")]
    Presentation(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DesignError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DesignError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn settings(phase: Phase, reason: impl Into<String>) -> Self {
        DesignError::InvalidSettings {
            phase,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = DesignError> = std::result::Result<T, E>;
