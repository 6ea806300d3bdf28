//! Falling-note track.
//!
//! Notes slide across the play area and resolve when they cross the judge
//! line. Spawning runs in one of three modes: a steady interval, a fixed
//! penalty burst after a wrong answer (followed by a drain wait), or stopped.
//! The track never reads a clock: [`NoteTrack::advance`] replays every spawn,
//! judgement and drain check up to `now` in timestamp order.

use crate::config::GameConfig;

pub type NoteId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteKind {
    Regular,
    /// Red notes from the wrong-answer burst.
    Penalty,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub kind: NoteKind,
    pub spawned_at: f64,
}

/// Snapshot for rendering; `progress` runs 0..1 over the fall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NotePosition {
    pub id: NoteId,
    pub kind: NoteKind,
    pub progress: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnMode {
    Stopped,
    Continuous { interval_ms: f64, next_at: f64 },
    Penalty { remaining: u32, next_at: f64 },
    /// Burst finished; waiting for the track to empty.
    Draining { check_at: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackEvent {
    Spawned(NoteId, NoteKind),
    /// Note crossed the judge line and was removed.
    Judged(NoteId),
    /// Drain check found the track empty at `at`.
    PenaltyDrained { at: f64 },
}

pub struct NoteTrack {
    notes: Vec<Note>,
    next_id: NoteId,
    mode: SpawnMode,
    spawned_in_run: u32,
    fall_ms: f64,
    judge_progress: f64,
    penalty_notes: u32,
    penalty_interval_ms: f64,
    penalty_first_check_ms: f64,
    penalty_recheck_ms: f64,
}

impl NoteTrack {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            notes: Vec::new(),
            next_id: 0,
            mode: SpawnMode::Stopped,
            spawned_in_run: 0,
            fall_ms: config.fall_duration_ms,
            judge_progress: config.judge_progress,
            penalty_notes: config.penalty_notes,
            penalty_interval_ms: config.penalty_interval_ms,
            penalty_first_check_ms: config.penalty_first_check_ms,
            penalty_recheck_ms: config.penalty_recheck_ms,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn mode(&self) -> SpawnMode {
        self.mode
    }

    /// Notes spawned since the last (re)start or penalty.
    pub fn spawned_in_run(&self) -> u32 {
        self.spawned_in_run
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// (Re)start steady spawning; the first note lands one interval after `now`.
    pub fn start_continuous(&mut self, interval_ms: f64, now: f64) {
        self.spawned_in_run = 0;
        self.mode = SpawnMode::Continuous { interval_ms, next_at: now + interval_ms };
        log::debug!("notes: continuous every {interval_ms}ms");
    }

    pub fn stop(&mut self) {
        self.mode = SpawnMode::Stopped;
    }

    /// Drop every note without judging it and stop spawning.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.stop();
    }

    /// Penalty burst whose interval timer starts at `start_at`.
    pub fn begin_penalty(&mut self, start_at: f64) {
        self.spawned_in_run = 0;
        self.mode = SpawnMode::Penalty {
            remaining: self.penalty_notes,
            next_at: start_at + self.penalty_interval_ms,
        };
        log::info!(
            "notes: penalty burst of {} every {}ms",
            self.penalty_notes,
            self.penalty_interval_ms
        );
    }

    pub fn positions(&self, now: f64) -> Vec<NotePosition> {
        self.notes
            .iter()
            .map(|n| NotePosition {
                id: n.id,
                kind: n.kind,
                progress: ((now - n.spawned_at) / self.fall_ms).clamp(0.0, 1.0),
            })
            .collect()
    }

    /// Replays deadlines up to `now`. Stops right after a drain, so the
    /// caller can restart the track at the drain time before going further.
    pub fn advance(&mut self, now: f64) -> Vec<TrackEvent> {
        let mut events = Vec::new();
        while let Some(at) = self.next_deadline().filter(|&at| at <= now) {
            if self.step_at(at, &mut events) {
                break;
            }
        }
        events
    }

    /// Earliest pending spawn, judgement or drain check.
    pub fn next_deadline(&self) -> Option<f64> {
        let timer = match self.mode {
            SpawnMode::Stopped => None,
            SpawnMode::Continuous { next_at, .. } | SpawnMode::Penalty { next_at, .. } => Some(next_at),
            SpawnMode::Draining { check_at } => Some(check_at),
        };
        let judge_after = self.judge_after();
        self.notes
            .iter()
            .map(|n| n.spawned_at + judge_after)
            .chain(timer)
            .reduce(f64::min)
    }

    fn judge_after(&self) -> f64 {
        self.fall_ms * self.judge_progress
    }

    // judgements go first so a drain check at the same instant sees them
    fn step_at(&mut self, at: f64, events: &mut Vec<TrackEvent>) -> bool {
        let judge_after = self.judge_after();
        self.notes.retain(|n| {
            if n.spawned_at + judge_after <= at {
                events.push(TrackEvent::Judged(n.id));
                false
            } else {
                true
            }
        });
        match self.mode {
            SpawnMode::Continuous { interval_ms, next_at } if next_at <= at => {
                self.spawn(NoteKind::Regular, next_at, events);
                self.mode = SpawnMode::Continuous { interval_ms, next_at: next_at + interval_ms };
            }
            SpawnMode::Penalty { remaining, next_at } if next_at <= at => {
                self.spawn(NoteKind::Penalty, next_at, events);
                self.mode = if remaining <= 1 {
                    SpawnMode::Draining { check_at: next_at + self.penalty_first_check_ms }
                } else {
                    SpawnMode::Penalty {
                        remaining: remaining - 1,
                        next_at: next_at + self.penalty_interval_ms,
                    }
                };
            }
            SpawnMode::Draining { check_at } if check_at <= at => {
                if self.notes.is_empty() {
                    self.mode = SpawnMode::Stopped;
                    log::info!("notes: penalty drained");
                    events.push(TrackEvent::PenaltyDrained { at: check_at });
                    return true;
                }
                self.mode = SpawnMode::Draining { check_at: check_at + self.penalty_recheck_ms };
            }
            _ => {}
        }
        false
    }

    fn spawn(&mut self, kind: NoteKind, at: f64, events: &mut Vec<TrackEvent>) {
        let id = self.next_id;
        self.next_id += 1;
        self.spawned_in_run += 1;
        self.notes.push(Note { id, kind, spawned_at: at });
        events.push(TrackEvent::Spawned(id, kind));
    }
}
