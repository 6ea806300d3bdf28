// Star-counting quiz.
// A grid of stars flashes with uneven row and column spacing. Hard questions
// punch out a few cells, so the count is no longer a plain product.
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::{Answer, ChoiceSet, Cue, Mode, Question, Quiz, QuizKind, Reveal, RevealScript};
use crate::config::GameConfig;
use crate::difficulty::roll_hard;
use crate::error::{QuizError, Result};

const GRID_SIDE: std::ops::RangeInclusive<u32> = 6..=12;
const HARD_REMOVALS: std::ops::RangeInclusive<usize> = 1..=9;
/// Hard-mode distractors stay within this fraction of the correct count.
const HARD_JITTER: f64 = 0.2;
const MAX_HARD_ATTEMPTS: usize = 1000;

/// Star grid layout handed to the stage.
///
/// Spans are fractions of the drawable area; each axis sums to roughly 1.
#[derive(Clone, Debug, PartialEq)]
pub struct StarField {
    pub rows: u32,
    pub cols: u32,
    /// `(row, col)` cells left empty.
    pub removed: Vec<(u32, u32)>,
    pub col_spans: Vec<f64>,
    pub row_spans: Vec<f64>,
}

impl StarField {
    pub fn star_count(&self) -> u32 {
        self.rows * self.cols - self.removed.len() as u32
    }

    pub fn is_removed(&self, row: u32, col: u32) -> bool {
        self.removed.contains(&(row, col))
    }

    /// Centre of each visible star, as fractions of the drawable area.
    pub fn star_centres(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::with_capacity(self.star_count() as usize);
        let mut y = 0.0;
        for (row, h) in self.row_spans.iter().enumerate() {
            let mut x = 0.0;
            for (col, w) in self.col_spans.iter().enumerate() {
                if !self.is_removed(row as u32, col as u32) {
                    out.push((x + w / 2.0, y + h / 2.0));
                }
                x += w;
            }
            y += h;
        }
        out
    }
}

/// `count` spans over a unit length: each of the first `count - 1` is drawn in
/// 50%..150% of the average; the last takes what remains, floored at 50%.
pub fn random_spans(count: u32, rng: &mut dyn RngCore) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let avg = 1.0 / count as f64;
    let mut spans = Vec::with_capacity(count as usize);
    let mut remaining = 1.0;
    for _ in 1..count {
        let span = rng.gen_range(avg * 0.5..avg * 1.5);
        spans.push(span);
        remaining -= span;
    }
    spans.push(f64::max(remaining, avg * 0.5));
    spans
}

#[derive(Default)]
pub struct MathQuiz {
    rows: u32,
    cols: u32,
    mode: Mode,
}

impl MathQuiz {
    pub fn new() -> Self {
        Self::default()
    }

    fn hard_choices(correct: u32, rng: &mut dyn RngCore) -> Result<Vec<u32>> {
        let range = (correct as f64 * HARD_JITTER).floor() as i64;
        let mut choices = vec![correct];
        for _ in 0..MAX_HARD_ATTEMPTS {
            if choices.len() == 3 {
                break;
            }
            let candidate = correct as i64 + rng.gen_range(-range..=range);
            if candidate > 0 && !choices.contains(&(candidate as u32)) {
                choices.push(candidate as u32);
            }
        }
        if choices.len() < 3 {
            return Err(QuizError::ChoicesExhausted { kind: QuizKind::Math });
        }
        Ok(choices)
    }

    fn normal_choices(grid: (u32, u32), correct: u32, rng: &mut dyn RngCore) -> Result<Vec<u32>> {
        let mut variations: Vec<(i32, i32)> = (-1..=1)
            .flat_map(|dr| (-1..=1).map(move |dc| (dr, dc)))
            .filter(|&v| v != (0, 0))
            .collect();
        variations.shuffle(rng);
        let mut choices = vec![correct];
        for (dr, dc) in variations {
            let rows = (grid.0 as i32 + dr).max(1) as u32;
            let cols = (grid.1 as i32 + dc).max(1) as u32;
            let candidate = rows * cols;
            if !choices.contains(&candidate) {
                choices.push(candidate);
                if choices.len() == 3 {
                    return Ok(choices);
                }
            }
        }
        Err(QuizError::ChoicesExhausted { kind: QuizKind::Math })
    }
}

impl Quiz for MathQuiz {
    fn kind(&self) -> QuizKind {
        QuizKind::Math
    }

    fn generate_question(&mut self, streak: u32, rng: &mut dyn RngCore) -> Result<Question> {
        let hard = roll_hard(streak, rng);
        self.rows = rng.gen_range(GRID_SIDE);
        self.cols = rng.gen_range(GRID_SIDE);
        self.mode = Mode::from_hard(hard);

        let total = self.rows * self.cols;
        let removed: Vec<(u32, u32)> = if hard {
            let count = rng.gen_range(HARD_REMOVALS);
            rand::seq::index::sample(rng, total as usize, count)
                .into_iter()
                .map(|i| (i as u32 / self.cols, i as u32 % self.cols))
                .collect()
        } else {
            Vec::new()
        };
        let field = StarField {
            rows: self.rows,
            cols: self.cols,
            removed,
            col_spans: random_spans(self.cols, rng),
            row_spans: random_spans(self.rows, rng),
        };
        let correct = field.star_count();
        log::debug!(
            "math question {}x{} - {} = {correct} ({:?})",
            self.rows,
            self.cols,
            field.removed.len(),
            self.mode
        );
        Ok(Question {
            kind: QuizKind::Math,
            mode: self.mode,
            reveal: Reveal::Stars(field),
            answer: Some(Answer::Number(correct)),
        })
    }

    fn reveal_script(&self, question: &Question, config: &GameConfig) -> RevealScript {
        let mut script = RevealScript { cues: Vec::new(), choices_after_ms: config.answer_delay_ms };
        if let Reveal::Stars(field) = &question.reveal {
            script = script.cue(0.0, Cue::ShowStars(field.clone()));
        }
        script.cue(config.stars_visible_ms, Cue::ClearStars)
    }

    fn generate_choices(&mut self, question: &Question, rng: &mut dyn RngCore) -> Result<ChoiceSet> {
        let Some(Answer::Number(correct)) = question.answer else {
            return Err(QuizError::MissingAnswer { kind: QuizKind::Math });
        };
        let mut choices = if question.mode.is_hard() {
            Self::hard_choices(correct, rng)?
        } else {
            let grid = match &question.reveal {
                Reveal::Stars(field) => (field.rows, field.cols),
                _ => (self.rows, self.cols),
            };
            Self::normal_choices(grid, correct, rng)?
        };
        choices.shuffle(rng);
        Ok(ChoiceSet {
            options: choices.into_iter().map(Answer::Number).collect(),
            correct: Answer::Number(correct),
        })
    }

    fn mode(&self) -> Mode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn numbers(set: &ChoiceSet) -> Vec<u32> {
        set.options
            .iter()
            .map(|a| match a {
                Answer::Number(n) => *n,
                Answer::Emoji(_) => panic!("emoji in math choices"),
            })
            .collect()
    }

    fn field(q: &Question) -> &StarField {
        match &q.reveal {
            Reveal::Stars(f) => f,
            _ => panic!("expected stars"),
        }
    }

    #[test]
    fn normal_answer_is_product_without_duplicates() {
        let mut quiz = MathQuiz::new();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..300 {
            let q = quiz.generate_question(0, &mut rng).unwrap();
            let f = field(&q);
            assert!(GRID_SIDE.contains(&f.rows) && GRID_SIDE.contains(&f.cols));
            assert!(f.removed.is_empty());
            assert_eq!(q.answer, Some(Answer::Number(f.rows * f.cols)));
            let choices = quiz.generate_choices(&q, &mut rng).unwrap();
            let nums = numbers(&choices);
            assert_eq!(nums.len(), 3);
            assert_eq!(nums.iter().collect::<HashSet<_>>().len(), 3);
            assert!(nums.contains(&(f.rows * f.cols)));
        }
    }

    #[test]
    fn hard_answer_subtracts_removed_and_stays_within_jitter() {
        let mut quiz = MathQuiz::new();
        let mut rng = StdRng::seed_from_u64(22);
        let mut hard_seen = 0;
        for _ in 0..500 {
            let q = quiz.generate_question(3, &mut rng).unwrap();
            if !q.mode.is_hard() {
                continue;
            }
            hard_seen += 1;
            let f = field(&q);
            assert!(HARD_REMOVALS.contains(&f.removed.len()));
            assert_eq!(f.removed.iter().collect::<HashSet<_>>().len(), f.removed.len());
            assert!(f.removed.iter().all(|&(r, c)| r < f.rows && c < f.cols));
            let correct = f.rows * f.cols - f.removed.len() as u32;
            assert_eq!(q.answer, Some(Answer::Number(correct)));

            let nums = numbers(&quiz.generate_choices(&q, &mut rng).unwrap());
            assert_eq!(nums.iter().collect::<HashSet<_>>().len(), 3);
            assert!(nums.contains(&correct));
            for n in nums {
                assert!(n > 0);
                let diff = (n as f64 - correct as f64).abs();
                assert!(diff <= correct as f64 * 0.2, "{n} too far from {correct}");
            }
        }
        assert!(hard_seen > 200, "hard_seen = {hard_seen}");
    }

    #[test]
    fn spans_fill_unit_length() {
        let mut rng = StdRng::seed_from_u64(23);
        for count in 1..=12 {
            let spans = random_spans(count, &mut rng);
            assert_eq!(spans.len(), count as usize);
            let avg = 1.0 / count as f64;
            assert!(spans.iter().all(|s| *s >= avg * 0.5 - 1e-9));
            assert!(spans[..spans.len() - 1].iter().all(|s| *s < avg * 1.5));
        }
        assert!(random_spans(0, &mut rng).is_empty());
    }

    #[test]
    fn centres_skip_removed_cells() {
        let f = StarField {
            rows: 2,
            cols: 2,
            removed: vec![(0, 1)],
            col_spans: vec![0.5, 0.5],
            row_spans: vec![0.5, 0.5],
        };
        assert_eq!(f.star_count(), 3);
        assert_eq!(f.star_centres(), vec![(0.25, 0.25), (0.25, 0.75), (0.75, 0.75)]);
    }

    #[test]
    fn reveal_clears_stars_before_choices() {
        let mut quiz = MathQuiz::new();
        let mut rng = StdRng::seed_from_u64(24);
        let q = quiz.generate_question(0, &mut rng).unwrap();
        let script = quiz.reveal_script(&q, &GameConfig::default());
        assert!(matches!(script.cues[0].cue, Cue::ShowStars(_)));
        assert_eq!(script.cues[1], crate::quiz::TimedCue { at_ms: 2000.0, cue: Cue::ClearStars });
        assert_eq!(script.choices_after_ms, 10_000.0);
    }

    #[test]
    fn missing_answer_is_an_error() {
        let q = Question {
            kind: QuizKind::Math,
            mode: Mode::Normal,
            reveal: Reveal::Glyph(String::new()),
            answer: None,
        };
        let mut rng = StdRng::seed_from_u64(25);
        assert!(matches!(
            MathQuiz::new().generate_choices(&q, &mut rng),
            Err(QuizError::MissingAnswer { kind: QuizKind::Math })
        ));
    }
}
