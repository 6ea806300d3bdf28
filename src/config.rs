//! Tunable timings for the quiz rounds and the note track.
//!
//! Every field has a default matching the shipped game, so a JSON override only
//! needs the keys it changes: `{"penalty_notes": 10, "seed": 7}`.

use serde::Deserialize;

use crate::error::ConfigError;

/// Upper bound for every millisecond field (one day).
pub const MAX_DURATION_MS: f64 = 86_400_000.0;
pub const MAX_COUNTDOWN_SECS: u32 = 600;

fn check_range(field: &'static str, value: f64, max: f64) -> Result<(), ConfigError> {
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, max })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Spawn interval used when a session starts.
    pub initial_note_interval_ms: f64,
    /// Pool rerolled after every answer (uniform pick).
    pub note_intervals: Vec<f64>,
    pub fall_duration_ms: f64,
    /// Fraction of the fall at which a note crosses the judge line.
    pub judge_progress: f64,

    pub question_delay_min_ms: f64,
    pub question_delay_span_ms: f64,
    /// Gap between the end of the reveal and the choices appearing.
    pub answer_delay_ms: f64,
    pub countdown_secs: u32,
    pub kanji_flash_ms: f64,
    pub stars_visible_ms: f64,
    /// Lowest stroke count the kanji choice window may start at.
    pub kanji_min_choice: u32,

    pub penalty_notes: u32,
    pub penalty_interval_ms: f64,
    pub penalty_start_delay_ms: f64,
    pub penalty_first_check_ms: f64,
    pub penalty_recheck_ms: f64,

    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_note_interval_ms: 3000.0,
            note_intervals: vec![5000.0, 4000.0, 3000.0, 2500.0],
            fall_duration_ms: 3000.0,
            // note centre meets the judge line at 20% of the play width
            judge_progress: 0.765,
            question_delay_min_ms: 10_000.0,
            question_delay_span_ms: 110_000.0,
            answer_delay_ms: 10_000.0,
            countdown_secs: 5,
            kanji_flash_ms: 1000.0,
            stars_visible_ms: 2000.0,
            kanji_min_choice: 10,
            penalty_notes: 20,
            penalty_interval_ms: 700.0,
            penalty_start_delay_ms: 10.0,
            penalty_first_check_ms: 500.0,
            penalty_recheck_ms: 1000.0,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.note_intervals.is_empty() {
            return Err(ConfigError::NoNoteIntervals);
        }
        let positive = [
            ("initial_note_interval_ms", self.initial_note_interval_ms),
            ("fall_duration_ms", self.fall_duration_ms),
            ("question_delay_span_ms", self.question_delay_span_ms),
            ("penalty_interval_ms", self.penalty_interval_ms),
            ("penalty_recheck_ms", self.penalty_recheck_ms),
        ];
        let intervals = self.note_intervals.iter().map(|&v| ("note_intervals", v));
        for (field, value) in positive.into_iter().chain(intervals.clone()) {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        let may_be_zero = [
            ("question_delay_min_ms", self.question_delay_min_ms),
            ("answer_delay_ms", self.answer_delay_ms),
            ("kanji_flash_ms", self.kanji_flash_ms),
            ("stars_visible_ms", self.stars_visible_ms),
            ("penalty_start_delay_ms", self.penalty_start_delay_ms),
            ("penalty_first_check_ms", self.penalty_first_check_ms),
        ];
        for (field, value) in positive.into_iter().chain(intervals).chain(may_be_zero) {
            check_range(field, value, MAX_DURATION_MS)?;
        }
        check_range("countdown_secs", self.countdown_secs as f64, MAX_COUNTDOWN_SECS as f64)?;
        for (field, count) in [
            ("penalty_notes", self.penalty_notes),
            ("kanji_min_choice", self.kanji_min_choice),
        ] {
            if count == 0 {
                return Err(ConfigError::NonPositive { field, value: 0.0 });
            }
        }
        if !(self.judge_progress > 0.0 && self.judge_progress <= 1.0) {
            return Err(ConfigError::JudgeProgress(self.judge_progress));
        }
        Ok(())
    }

    /// Closed-open range the next question delay is drawn from.
    pub fn question_delay_range(&self) -> std::ops::Range<f64> {
        let lo = self.question_delay_min_ms.max(0.0);
        lo..lo + self.question_delay_span_ms.max(1.0)
    }
}
