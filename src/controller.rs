//! Round controller tying quizzes, difficulty and the note track together.
//!
//! Round flow: `Idle → Scheduled → Revealing → Answering`, then either straight
//! back to `Scheduled` (correct answer) or through `Penalty` (wrong answer or
//! timeout) until the penalty burst drains. Everything is driven by
//! [`QuizSystem::tick`]; deadlines are processed at their own timestamps so a
//! late frame replays the same sequence a punctual one would.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::GameConfig;
use crate::difficulty::Difficulty;
use crate::error::{QuizError, Result};
use crate::notes::{NoteTrack, TrackEvent};
use crate::quiz::{ChoiceSet, Cue, KanjiBank, Mode, Question, Quiz, QuizKind, RevealScript, build_quiz};
use crate::stage::{Sound, Stage};

const COUNTDOWN_STEP_MS: f64 = 1000.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub answered: u32,
    pub correct: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scheduled,
    Revealing,
    Answering,
    Penalty,
}

enum Round {
    Idle,
    Scheduled {
        at: f64,
        rotate: bool,
    },
    Revealing {
        question: Question,
        script: RevealScript,
        started_at: f64,
        next_cue: usize,
    },
    Answering {
        question: Question,
        choices: ChoiceSet,
        shown_at: f64,
        ticks_shown: u32,
    },
    Penalty,
}

pub struct QuizSystem<S: Stage> {
    config: GameConfig,
    stage: S,
    rng: StdRng,
    bank: Rc<KanjiBank>,
    difficulty: Difficulty,
    stats: Stats,
    running: bool,
    quiz: Option<Box<dyn Quiz>>,
    round: Round,
    notes: NoteTrack,
}

impl<S: Stage> QuizSystem<S> {
    pub fn new(config: GameConfig, bank: KanjiBank, stage: S) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            notes: NoteTrack::new(&config),
            config,
            stage,
            rng,
            bank: Rc::new(bank),
            difficulty: Difficulty::new(),
            stats: Stats::default(),
            running: false,
            quiz: None,
            round: Round::Idle,
        })
    }

    /// Start with a random quiz kind.
    pub fn start(&mut self, now: f64) {
        let kind = QuizKind::random(&mut self.rng);
        self.start_with(kind, now);
    }

    pub fn start_with(&mut self, kind: QuizKind, now: f64) {
        if self.running {
            return;
        }
        self.running = true;
        self.stats = Stats::default();
        self.difficulty.reset();
        self.quiz = Some(build_quiz(kind, &self.bank, &self.config));
        log::info!("quiz session started with {}", kind.display_name());
        self.notes.start_continuous(self.config.initial_note_interval_ms, now);
        self.round = self.scheduled(now, false);
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.notes.clear();
        self.quiz = None;
        self.round = Round::Idle;
        self.stage.clear_countdown();
        self.stage.hide_choices();
        self.stage.clear_text();
        self.stage.clear_stars();
        self.stage.set_mode(Mode::Normal);
        self.stage.draw_notes(&[]);
        log::info!(
            "quiz session stopped: {}/{} correct",
            self.stats.correct,
            self.stats.answered
        );
    }

    pub fn tick(&mut self, now: f64) {
        if !self.running {
            return;
        }
        // note and round deadlines interleave in timestamp order
        loop {
            let until = self.round_deadline().filter(|&at| at < now).unwrap_or(now);
            if self.advance_notes(until) {
                continue;
            }
            let round = std::mem::replace(&mut self.round, Round::Idle);
            let (next, fired) = self.step(round, until);
            self.round = next;
            if !fired {
                break;
            }
        }
        let positions = self.notes.positions(now);
        self.stage.draw_notes(&positions);
    }

    /// Answer the offered choice at `index`; returns whether it was correct.
    pub fn answer(&mut self, index: usize, now: f64) -> Result<bool> {
        if !self.running {
            return Err(QuizError::NotRunning);
        }
        // a countdown that already ran out wins over a late click
        self.tick(now);
        let Round::Answering { choices, .. } = &self.round else {
            return Err(QuizError::NotAcceptingAnswers);
        };
        let correct = choices
            .is_correct(index)
            .ok_or(QuizError::ChoiceOutOfRange { index, len: choices.options.len() })?;
        self.round = self.resolve(correct, true, now);
        Ok(correct)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> Phase {
        match self.round {
            Round::Idle => Phase::Idle,
            Round::Scheduled { .. } => Phase::Scheduled,
            Round::Revealing { .. } => Phase::Revealing,
            Round::Answering { .. } => Phase::Answering,
            Round::Penalty => Phase::Penalty,
        }
    }

    pub fn streak(&self) -> u32 {
        self.difficulty.consecutive_correct()
    }

    pub fn hard_probability(&self) -> f64 {
        self.difficulty.hard_probability()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn quiz_kind(&self) -> Option<QuizKind> {
        self.quiz.as_ref().map(|q| q.kind())
    }

    pub fn question(&self) -> Option<&Question> {
        match &self.round {
            Round::Revealing { question, .. } | Round::Answering { question, .. } => Some(question),
            _ => None,
        }
    }

    pub fn choices(&self) -> Option<&ChoiceSet> {
        match &self.round {
            Round::Answering { choices, .. } => Some(choices),
            _ => None,
        }
    }

    pub fn next_question_at(&self) -> Option<f64> {
        match self.round {
            Round::Scheduled { at, .. } => Some(at),
            _ => None,
        }
    }

    pub fn notes(&self) -> &NoteTrack {
        &self.notes
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    /// Earliest pending deadline of the current round.
    fn round_deadline(&self) -> Option<f64> {
        match &self.round {
            Round::Scheduled { at, .. } => Some(*at),
            Round::Revealing { script, started_at, next_cue, .. } => {
                let choices_at = started_at + script.choices_after_ms;
                let cue_at = script.cues.get(*next_cue).map(|c| started_at + c.at_ms);
                Some(cue_at.map_or(choices_at, |at| at.min(choices_at)))
            }
            Round::Answering { shown_at, ticks_shown, .. } => {
                let secs = self.config.countdown_secs;
                let steps = if *ticks_shown < secs { ticks_shown + 1 } else { secs + 1 };
                Some(shown_at + steps as f64 * COUNTDOWN_STEP_MS)
            }
            Round::Idle | Round::Penalty => None,
        }
    }

    /// Runs the note track up to `until`; true when a penalty drained on the way.
    fn advance_notes(&mut self, until: f64) -> bool {
        let mut drained = false;
        for event in self.notes.advance(until) {
            match event {
                TrackEvent::Judged(_) => self.stage.play(Sound::Hit),
                TrackEvent::PenaltyDrained { at } => {
                    drained = true;
                    self.restart_notes(at);
                    if matches!(self.round, Round::Penalty) {
                        self.round = self.after_penalty(at);
                    }
                }
                TrackEvent::Spawned(..) => {}
            }
        }
        drained
    }

    /// Returns the next round and whether any deadline fired.
    fn step(&mut self, round: Round, now: f64) -> (Round, bool) {
        match round {
            Round::Scheduled { at, rotate } if now >= at => (self.begin_question(at, rotate), true),
            Round::Revealing { question, script, started_at, next_cue } => {
                let mut cue = next_cue;
                while let Some(timed) = script.cues.get(cue) {
                    if started_at + timed.at_ms > now {
                        break;
                    }
                    self.apply_cue(&timed.cue);
                    cue += 1;
                }
                let choices_at = started_at + script.choices_after_ms;
                if now >= choices_at {
                    (self.offer_choices(question, choices_at), true)
                } else {
                    let fired = cue != next_cue;
                    (Round::Revealing { question, script, started_at, next_cue: cue }, fired)
                }
            }
            Round::Answering { question, choices, shown_at, ticks_shown } => {
                let secs = self.config.countdown_secs;
                let mut shown = ticks_shown;
                while shown < secs && now >= shown_at + (shown + 1) as f64 * COUNTDOWN_STEP_MS {
                    shown += 1;
                    self.stage.show_countdown(secs + 1 - shown);
                }
                let timeout_at = shown_at + (secs + 1) as f64 * COUNTDOWN_STEP_MS;
                if now >= timeout_at {
                    log::info!("{} question timed out", question.kind.as_str());
                    (self.resolve(false, false, timeout_at), true)
                } else {
                    let fired = shown != ticks_shown;
                    (Round::Answering { question, choices, shown_at, ticks_shown: shown }, fired)
                }
            }
            other => (other, false),
        }
    }

    fn scheduled(&mut self, from: f64, rotate: bool) -> Round {
        let delay = self.rng.gen_range(self.config.question_delay_range());
        log::debug!("next question in {:.1}s", delay / 1000.0);
        Round::Scheduled { at: from + delay, rotate }
    }

    /// After a drain two question delays run back to back and the current
    /// quiz is kept.
    fn after_penalty(&mut self, drained_at: f64) -> Round {
        let resume = self.rng.gen_range(self.config.question_delay_range());
        self.scheduled(drained_at + resume, false)
    }

    fn begin_question(&mut self, at: f64, rotate: bool) -> Round {
        if rotate {
            let kind = QuizKind::random(&mut self.rng);
            self.quiz = Some(build_quiz(kind, &self.bank, &self.config));
            log::info!("next quiz: {}", kind.display_name());
        }
        let streak = self.difficulty.consecutive_correct();
        let Some(quiz) = self.quiz.as_mut() else {
            return Round::Idle;
        };
        match quiz.generate_question(streak, &mut self.rng) {
            Ok(question) => {
                let script = quiz.reveal_script(&question, &self.config);
                log::info!(
                    "{} question ({:?}, streak {streak})",
                    question.kind.as_str(),
                    question.mode
                );
                self.stage.set_mode(question.mode);
                self.stage.play(Sound::Prompt);
                self.stage.hide_choices();
                Round::Revealing { question, script, started_at: at, next_cue: 0 }
            }
            Err(e) => {
                log::warn!("question generation failed: {e}");
                self.scheduled(at, true)
            }
        }
    }

    fn apply_cue(&mut self, cue: &Cue) {
        match cue {
            Cue::ShowText(text) => self.stage.show_text(text),
            Cue::ClearText => self.stage.clear_text(),
            Cue::ShowStars(field) => self.stage.show_stars(field),
            Cue::ClearStars => self.stage.clear_stars(),
        }
    }

    fn offer_choices(&mut self, question: Question, at: f64) -> Round {
        let Some(quiz) = self.quiz.as_mut() else {
            return Round::Idle;
        };
        match quiz.generate_choices(&question, &mut self.rng) {
            Ok(choices) => {
                log::debug!("choices {:?}, correct {}", choices.labels(), choices.correct);
                self.stage.play(Sound::Option);
                self.stage.show_choices(&choices.labels());
                Round::Answering { question, choices, shown_at: at, ticks_shown: 0 }
            }
            Err(e) => {
                log::warn!("choice generation failed: {e}");
                self.stage.set_mode(Mode::Normal);
                self.scheduled(at, true)
            }
        }
    }

    /// `clicked` is false for a timeout, which skips the quiz's own cleanup.
    fn resolve(&mut self, correct: bool, clicked: bool, at: f64) -> Round {
        self.stage.clear_countdown();
        self.stage.hide_choices();
        if clicked {
            if let Some(quiz) = self.quiz.as_mut() {
                quiz.handle_answer_result(correct, &mut self.stage);
            }
        }
        self.stats.answered += 1;
        self.difficulty.record(correct);
        if correct {
            self.stats.correct += 1;
            log::info!("correct, streak {}", self.difficulty.consecutive_correct());
            self.stage.play(Sound::Correct);
            self.restart_notes(at);
            self.scheduled(at, true)
        } else {
            log::info!("wrong, streak reset");
            self.stage.play(Sound::Error);
            self.notes.clear();
            self.stage.draw_notes(&[]);
            self.notes.begin_penalty(at + self.config.penalty_start_delay_ms);
            Round::Penalty
        }
    }

    fn restart_notes(&mut self, at: f64) {
        let interval = self
            .config
            .note_intervals
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(self.config.initial_note_interval_ms);
        self.notes.start_continuous(interval, at);
    }
}
