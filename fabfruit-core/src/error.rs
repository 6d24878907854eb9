use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown {kind} label '{value}'")]
    UnknownLabel { kind: &'static str, value: String },

    #[error("box line '{0}' does not match 'name: stim -> outcome (direction)'")]
    MalformedBoxLine(String),

    #[error("fruit '{0}' is used by more than one box")]
    DuplicateFruit(String),

    #[error("box name '{0}' is used more than once")]
    DuplicateBox(String),
}
