//! Quiz variants interrupting the note stream.
//!
//! Every variant follows the same round shape: generate a question (hard or
//! normal, decided by the shared streak), play a timed reveal script, then offer
//! exactly three distinct choices. Variant modules:
//! - `kanji`: flash a glyph, ask for its stroke count
//! - `emoji`: show a run of emoji, ask which of three appeared last
//! - `math`: flash a grid of stars, ask how many there were
use std::fmt;
use std::rc::Rc;

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::config::GameConfig;
use crate::error::Result;
use crate::stage::Stage;

mod emoji;
mod kanji;
mod math;

pub use emoji::{EMOJI_POOL, EmojiQuiz};
pub use kanji::{KanjiBank, KanjiEntry, KanjiQuiz, stroke_window};
pub use math::{MathQuiz, StarField, random_spans};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuizKind {
    Kanji,
    Emoji,
    Math,
}

impl QuizKind {
    pub const ALL: [QuizKind; 3] = [QuizKind::Kanji, QuizKind::Emoji, QuizKind::Math];

    pub fn as_str(self) -> &'static str {
        match self {
            QuizKind::Kanji => "kanji",
            QuizKind::Emoji => "emoji",
            QuizKind::Math => "math",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            QuizKind::Kanji => "Kanji stroke quiz",
            QuizKind::Emoji => "Emoji memory quiz",
            QuizKind::Math => "Star counting quiz",
        }
    }

    /// Uniform pick over [`QuizKind::ALL`].
    pub fn random(rng: &mut dyn RngCore) -> QuizKind {
        *QuizKind::ALL.choose(rng).unwrap_or(&QuizKind::Kanji)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    Hard,
}

impl Mode {
    pub fn from_hard(hard: bool) -> Self {
        if hard { Mode::Hard } else { Mode::Normal }
    }

    pub fn is_hard(self) -> bool {
        matches!(self, Mode::Hard)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Answer {
    Number(u32),
    Emoji(&'static str),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Number(n) => write!(f, "{n}"),
            Answer::Emoji(e) => f.write_str(e),
        }
    }
}

/// What the reveal phase shows.
#[derive(Clone, Debug, PartialEq)]
pub enum Reveal {
    Glyph(String),
    Sequence {
        items: Vec<&'static str>,
        interval_ms: f64,
    },
    Stars(StarField),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Question {
    pub kind: QuizKind,
    pub mode: Mode,
    pub reveal: Reveal,
    /// `None` until choices exist (emoji answers depend on which three are offered).
    pub answer: Option<Answer>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cue {
    ShowText(String),
    ClearText,
    ShowStars(StarField),
    ClearStars,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimedCue {
    /// Offset from the reveal start.
    pub at_ms: f64,
    pub cue: Cue,
}

/// Timed cues for the reveal phase; choices follow after `choices_after_ms`.
#[derive(Clone, Debug, PartialEq)]
pub struct RevealScript {
    pub cues: Vec<TimedCue>,
    pub choices_after_ms: f64,
}

impl RevealScript {
    fn cue(mut self, at_ms: f64, cue: Cue) -> Self {
        self.cues.push(TimedCue { at_ms, cue });
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceSet {
    pub options: Vec<Answer>,
    pub correct: Answer,
}

impl ChoiceSet {
    pub fn is_correct(&self, index: usize) -> Option<bool> {
        self.options.get(index).map(|a| *a == self.correct)
    }

    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(ToString::to_string).collect()
    }
}

pub trait Quiz {
    fn kind(&self) -> QuizKind;

    /// `streak` is the shared consecutive-correct count.
    fn generate_question(&mut self, streak: u32, rng: &mut dyn RngCore) -> Result<Question>;

    fn reveal_script(&self, question: &Question, config: &GameConfig) -> RevealScript;

    fn generate_choices(&mut self, question: &Question, rng: &mut dyn RngCore) -> Result<ChoiceSet>;

    /// Mode of the last generated question.
    fn mode(&self) -> Mode;

    fn handle_answer_result(&mut self, correct: bool, stage: &mut dyn Stage) {
        log::debug!(
            "{} answer: {}",
            self.kind().as_str(),
            if correct { "correct" } else { "wrong" }
        );
        if self.mode().is_hard() {
            stage.set_mode(Mode::Normal);
        }
    }
}

pub fn build_quiz(kind: QuizKind, bank: &Rc<KanjiBank>, config: &GameConfig) -> Box<dyn Quiz> {
    match kind {
        QuizKind::Kanji => Box::new(KanjiQuiz::new(Rc::clone(bank), config.kanji_min_choice)),
        QuizKind::Emoji => Box::new(EmojiQuiz::new()),
        QuizKind::Math => Box::new(MathQuiz::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_kind_covers_all_variants() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(QuizKind::random(&mut rng));
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn choice_set_checks_index() {
        let set = ChoiceSet {
            options: vec![Answer::Number(3), Answer::Number(5), Answer::Number(4)],
            correct: Answer::Number(5),
        };
        assert_eq!(set.is_correct(1), Some(true));
        assert_eq!(set.is_correct(0), Some(false));
        assert_eq!(set.is_correct(3), None);
        assert_eq!(set.labels(), vec!["3", "5", "4"]);
    }
}
