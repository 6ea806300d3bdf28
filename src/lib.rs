//! Beat Quiz core crate.
//!
//! Falling notes stream across the play area while a quiz periodically
//! interrupts: kanji stroke counts, emoji sequence memory, or star counting.
//! A shared consecutive-correct streak raises the chance of hard questions;
//! wrong answers reset it and trigger a burst of penalty notes.
//!
//! The gameplay core ([`QuizSystem`]) is clock-free and renders through the
//! [`Stage`] trait, so it runs natively under `cargo test`. The [`web`] module
//! binds it to the DOM and `requestAnimationFrame`.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod controller;
pub mod difficulty;
pub mod error;
pub mod notes;
pub mod quiz;
pub mod stage;
pub mod web;

pub use config::GameConfig;
pub use controller::{Phase, QuizSystem, Stats};
pub use difficulty::{Difficulty, hard_probability};
pub use error::{ConfigError, QuizError};
pub use quiz::{Answer, ChoiceSet, Mode, Question, QuizKind};
pub use stage::{Sound, Stage};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    // a second init only fails because a logger is already installed
    #[cfg(target_arch = "wasm32")]
    let _ = console_log::init_with_level(log::Level::Info);
}
