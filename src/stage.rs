//! Rendering / audio collaborator the controller drives.
//!
//! The browser implementation lives in [`crate::web`]; tests record calls.

use crate::notes::NotePosition;
use crate::quiz::{Mode, StarField};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sound {
    /// Note crossed the judge line.
    Hit,
    /// A question is about to be revealed.
    Prompt,
    /// Choices appeared.
    Option,
    Correct,
    Error,
}

pub trait Stage {
    fn play(&mut self, sound: Sound);
    /// Frame colour of the quiz square.
    fn set_mode(&mut self, mode: Mode);
    fn show_text(&mut self, text: &str);
    fn clear_text(&mut self);
    fn show_stars(&mut self, field: &StarField);
    fn clear_stars(&mut self);
    fn show_choices(&mut self, labels: &[String]);
    fn hide_choices(&mut self);
    fn show_countdown(&mut self, secs_left: u32);
    fn clear_countdown(&mut self);
    /// Called once per tick with every live note.
    fn draw_notes(&mut self, _notes: &[NotePosition]) {}
}
