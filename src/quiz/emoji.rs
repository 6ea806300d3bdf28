// Emoji sequence-memory quiz.
// A run of distinct emoji plays one at a time; of three offered afterwards, the
// one shown latest is correct.
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::{Answer, ChoiceSet, Cue, Mode, Question, Quiz, QuizKind, Reveal, RevealScript};
use crate::config::GameConfig;
use crate::difficulty::roll_hard;
use crate::error::{QuizError, Result};

#[rustfmt::skip]
pub const EMOJI_POOL: [&str; 100] = [
    "🍎", "🍊", "🍋", "🍌", "🍉", "🍇", "🍓", "🍈", "🍒", "🍑",
    "🥭", "🍍", "🥥", "🥝", "🍅", "🍆", "🥑", "🥦", "🥬", "🥒",
    "🌶️", "🌽", "🥕", "🧄", "🧅", "🥔", "🍠", "🥐", "🥖", "🍞",
    "🥨", "🥯", "🧀", "🥚", "🍳", "🧈", "🥞", "🧇", "🥓", "🥩",
    "🍗", "🍖", "🦴", "🌭", "🍔", "🍟", "🍕", "🥪", "🥙", "🧆",
    "🌮", "🌯", "🥗", "🥘", "🍝", "🍜", "🍲", "🍛", "🍣", "🍱",
    "🥟", "🦪", "🍤", "🍙", "🍚", "🍘", "🍥", "🥠", "🍢", "🍡",
    "🍧", "🍨", "🍦", "🥧", "🧁", "🍰", "🎂", "🍮", "🍭", "🍬",
    "🍫", "🍿", "🍩", "🍪", "🌰", "🥜", "🍯", "🥛", "🍼", "☕",
    "🍵", "🧃", "🥤", "🍶", "🍺", "🍻", "🥂", "🍷", "🥃", "🍸",
];

const NORMAL_COUNT: std::ops::RangeInclusive<usize> = 6..=10;
const HARD_COUNT: std::ops::RangeInclusive<usize> = 11..=15;
const NORMAL_INTERVAL_MS: f64 = 500.0;
const HARD_INTERVAL_MS: f64 = 300.0;

#[derive(Default)]
pub struct EmojiQuiz {
    sequence: Vec<&'static str>,
    mode: Mode,
}

impl EmojiQuiz {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display index of `emoji` in the last sequence.
    pub fn position(&self, emoji: &str) -> Option<usize> {
        self.sequence.iter().position(|e| *e == emoji)
    }
}

impl Quiz for EmojiQuiz {
    fn kind(&self) -> QuizKind {
        QuizKind::Emoji
    }

    fn generate_question(&mut self, streak: u32, rng: &mut dyn RngCore) -> Result<Question> {
        let hard = roll_hard(streak, rng);
        let (count, interval_ms) = if hard {
            (rng.gen_range(HARD_COUNT), HARD_INTERVAL_MS)
        } else {
            (rng.gen_range(NORMAL_COUNT), NORMAL_INTERVAL_MS)
        };
        self.sequence = EMOJI_POOL.choose_multiple(rng, count).copied().collect();
        self.mode = Mode::from_hard(hard);
        log::debug!("emoji sequence {:?} at {interval_ms}ms", self.sequence);
        Ok(Question {
            kind: QuizKind::Emoji,
            mode: self.mode,
            reveal: Reveal::Sequence { items: self.sequence.clone(), interval_ms },
            answer: None,
        })
    }

    fn reveal_script(&self, question: &Question, config: &GameConfig) -> RevealScript {
        let (items, interval_ms) = match &question.reveal {
            Reveal::Sequence { items, interval_ms } => (items.as_slice(), *interval_ms),
            _ => (&[][..], 0.0),
        };
        let end = items.len() as f64 * interval_ms;
        let mut script = RevealScript { cues: Vec::new(), choices_after_ms: end + config.answer_delay_ms };
        for (i, item) in items.iter().enumerate() {
            script = script.cue(i as f64 * interval_ms, Cue::ShowText((*item).to_string()));
        }
        script.cue(end, Cue::ClearText)
    }

    fn generate_choices(&mut self, question: &Question, rng: &mut dyn RngCore) -> Result<ChoiceSet> {
        let sequence = match &question.reveal {
            Reveal::Sequence { items, .. } => items.as_slice(),
            _ => self.sequence.as_slice(),
        };
        if sequence.len() < 3 {
            return Err(QuizError::SequenceTooShort(sequence.len()));
        }
        let picked: Vec<usize> = rand::seq::index::sample(rng, sequence.len(), 3).into_vec();
        // latest-shown wins
        let latest = picked.iter().copied().max().unwrap_or(0);
        let options = picked.iter().map(|&i| Answer::Emoji(sequence[i])).collect();
        Ok(ChoiceSet { options, correct: Answer::Emoji(sequence[latest]) })
    }

    fn mode(&self) -> Mode {
        self.mode
    }
}
