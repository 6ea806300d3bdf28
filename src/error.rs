//! Error types shared by the quiz core and the wasm surface.

use thiserror::Error;

use crate::quiz::QuizKind;

/// Problems with a [`GameConfig`](crate::config::GameConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("note_intervals must contain at least one interval")]
    NoNoteIntervals,
    #[error("`{field}` must be positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("`{field}` must be between 0 and {max} (got {value})")]
    OutOfRange { field: &'static str, value: f64, max: f64 },
    #[error("judge_progress must be in (0, 1] (got {0})")]
    JudgeProgress(f64),
}

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("quiz system is not running")]
    NotRunning,
    #[error("no choices are currently offered")]
    NotAcceptingAnswers,
    #[error("choice {index} out of range (offered {len})")]
    ChoiceOutOfRange { index: usize, len: usize },
    #[error("{kind:?} quiz could not produce 3 distinct choices")]
    ChoicesExhausted { kind: QuizKind },
    #[error("{kind:?} question has no answer yet")]
    MissingAnswer { kind: QuizKind },
    #[error("kanji bank has an empty `{0}` list")]
    EmptyBank(&'static str),
    #[error("kanji `{kanji}` has an unusable stroke count {strokes}")]
    BadStrokes { kanji: String, strokes: u32 },
    #[error("emoji sequence of {0} items is too short for 3 choices")]
    SequenceTooShort(usize),
    #[error("invalid kanji data: {0}")]
    Data(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = QuizError> = std::result::Result<T, E>;
