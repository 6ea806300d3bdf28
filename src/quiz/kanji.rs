// Kanji stroke-count quiz.
// A glyph flashes for a moment; the player picks its stroke count from a
// window of three consecutive numbers.
use std::rc::Rc;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::Deserialize;

use super::{Answer, ChoiceSet, Cue, Mode, Question, Quiz, QuizKind, Reveal, RevealScript};
use crate::config::GameConfig;
use crate::difficulty::roll_hard;
use crate::error::{QuizError, Result};

static BUNDLED_KANJI: &str = include_str!("../../data/kanji.json");

/// Highest stroke count of any kanji in common dictionaries.
pub const MAX_STROKES: u32 = 84;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct KanjiEntry {
    pub kanji: String,
    pub strokes: u32,
}

/// Normal and hard glyph pools.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct KanjiBank {
    #[serde(rename = "kanji")]
    pub normal: Vec<KanjiEntry>,
    #[serde(rename = "hardKanji")]
    pub hard: Vec<KanjiEntry>,
}

impl KanjiBank {
    pub fn from_json(json: &str) -> Result<Self> {
        let bank: KanjiBank = serde_json::from_str(json)?;
        if bank.normal.is_empty() {
            return Err(QuizError::EmptyBank("kanji"));
        }
        if bank.hard.is_empty() {
            return Err(QuizError::EmptyBank("hardKanji"));
        }
        if let Some(bad) = bank
            .normal
            .iter()
            .chain(&bank.hard)
            .find(|e| !(1..=MAX_STROKES).contains(&e.strokes))
        {
            return Err(QuizError::BadStrokes { kanji: bad.kanji.clone(), strokes: bad.strokes });
        }
        Ok(bank)
    }

    pub fn bundled() -> Self {
        match Self::from_json(BUNDLED_KANJI) {
            Ok(bank) => bank,
            Err(e) => {
                log::error!("bundled kanji data unusable ({e}), using minimal set");
                Self::minimal()
            }
        }
    }

    /// Caller-supplied data, falling back to the bundled bank when it is unusable.
    pub fn load_or_bundled(json: Option<&str>) -> Self {
        let Some(json) = json else {
            return Self::bundled();
        };
        match Self::from_json(json) {
            Ok(bank) => {
                log::info!(
                    "kanji data loaded: {} normal, {} hard",
                    bank.normal.len(),
                    bank.hard.len()
                );
                bank
            }
            Err(e) => {
                log::warn!("kanji data rejected ({e}), using bundled set");
                Self::bundled()
            }
        }
    }

    fn minimal() -> Self {
        let entry = |kanji: &str, strokes| KanjiEntry { kanji: kanji.to_string(), strokes };
        Self {
            normal: vec![entry("漢", 13), entry("算", 14), entry("線", 15)],
            hard: vec![entry("鬱", 29), entry("鑑", 23)],
        }
    }
}

/// Three consecutive stroke counts containing `correct`, shuffled.
///
/// One of the windows `[c-2, c]`, `[c-1, c+1]`, `[c, c+2]` is picked
/// uniformly; its low end is raised to `min` but never past `correct`.
pub fn stroke_window(correct: u32, min: u32, rng: &mut dyn RngCore) -> [u32; 3] {
    let shift = rng.gen_range(0..3u32);
    let lo = correct.saturating_sub(2 - shift);
    let lo = lo.max(min.max(1)).min(correct).min(u32::MAX - 2);
    let mut window = [lo, lo + 1, lo + 2];
    window.shuffle(rng);
    window
}

pub struct KanjiQuiz {
    bank: Rc<KanjiBank>,
    min_choice: u32,
    mode: Mode,
}

impl KanjiQuiz {
    pub fn new(bank: Rc<KanjiBank>, min_choice: u32) -> Self {
        Self { bank, min_choice, mode: Mode::Normal }
    }
}

impl Quiz for KanjiQuiz {
    fn kind(&self) -> QuizKind {
        QuizKind::Kanji
    }

    fn generate_question(&mut self, streak: u32, rng: &mut dyn RngCore) -> Result<Question> {
        let hard = roll_hard(streak, rng);
        let (pool, name) = if hard {
            (&self.bank.hard, "hardKanji")
        } else {
            (&self.bank.normal, "kanji")
        };
        let entry = pool.choose(rng).ok_or(QuizError::EmptyBank(name))?;
        self.mode = Mode::from_hard(hard);
        log::debug!("kanji question {} ({} strokes, {:?})", entry.kanji, entry.strokes, self.mode);
        Ok(Question {
            kind: QuizKind::Kanji,
            mode: self.mode,
            reveal: Reveal::Glyph(entry.kanji.clone()),
            answer: Some(Answer::Number(entry.strokes)),
        })
    }

    fn reveal_script(&self, question: &Question, config: &GameConfig) -> RevealScript {
        let glyph = match &question.reveal {
            Reveal::Glyph(g) => g.clone(),
            _ => String::new(),
        };
        RevealScript { cues: Vec::new(), choices_after_ms: config.kanji_flash_ms + config.answer_delay_ms }
            .cue(0.0, Cue::ShowText(glyph))
            .cue(config.kanji_flash_ms, Cue::ClearText)
    }

    fn generate_choices(&mut self, question: &Question, rng: &mut dyn RngCore) -> Result<ChoiceSet> {
        let Some(Answer::Number(correct)) = question.answer else {
            return Err(QuizError::MissingAnswer { kind: QuizKind::Kanji });
        };
        let options = stroke_window(correct, self.min_choice, rng)
            .into_iter()
            .map(Answer::Number)
            .collect();
        Ok(ChoiceSet { options, correct: Answer::Number(correct) })
    }

    fn mode(&self) -> Mode {
        self.mode
    }
}
