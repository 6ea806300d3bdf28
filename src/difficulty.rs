//! Adaptive difficulty shared by every quiz variant.
//!
//! A single consecutive-correct streak drives the chance that the next question
//! is drawn in hard mode.

use rand::{Rng, RngCore};

/// Hard-mode probability indexed by streak; the last entry holds for longer streaks.
pub const HARD_PROBABILITY: [f64; 4] = [0.0, 0.20, 0.40, 0.60];

pub fn hard_probability(streak: u32) -> f64 {
    let idx = (streak as usize).min(HARD_PROBABILITY.len() - 1);
    HARD_PROBABILITY[idx]
}

/// One uniform draw compared against [`hard_probability`].
pub fn roll_hard(streak: u32, rng: &mut dyn RngCore) -> bool {
    let p = hard_probability(streak);
    rng.gen_range(0.0..1.0) < p
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Difficulty {
    consecutive_correct: u32,
}

impl Difficulty {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_correct(&self) -> u32 {
        self.consecutive_correct
    }

    pub fn hard_probability(&self) -> f64 {
        hard_probability(self.consecutive_correct)
    }

    /// Timeouts count as incorrect.
    pub fn record(&mut self, correct: bool) {
        if correct {
            self.consecutive_correct = self.consecutive_correct.saturating_add(1);
        } else {
            self.consecutive_correct = 0;
        }
    }

    pub fn reset(&mut self) {
        self.consecutive_correct = 0;
    }
}
