// Round-flow tests for `QuizSystem`, driven by a synthetic clock and a stage
// that records every call. Native only; no browser APIs involved.

use std::collections::HashSet;

use beat_quiz::notes::{NoteKind, NotePosition, SpawnMode};
use beat_quiz::quiz::{KanjiBank, Reveal, StarField};
use beat_quiz::{Answer, GameConfig, Mode, Phase, QuizError, QuizKind, QuizSystem, Sound, Stage};

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Play(Sound),
    SetMode(Mode),
    Text(String),
    ClearText,
    Stars(u32),
    ClearStars,
    Choices(Vec<String>),
    HideChoices,
    Countdown(u32),
    ClearCountdown,
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    penalty_ids: HashSet<u64>,
    regular_ids: HashSet<u64>,
}

impl Recorder {
    fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn last_mode(&self) -> Option<Mode> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::SetMode(m) => Some(*m),
            _ => None,
        })
    }
}

impl Stage for Recorder {
    fn play(&mut self, sound: Sound) {
        self.calls.push(Call::Play(sound));
    }
    fn set_mode(&mut self, mode: Mode) {
        self.calls.push(Call::SetMode(mode));
    }
    fn show_text(&mut self, text: &str) {
        self.calls.push(Call::Text(text.to_string()));
    }
    fn clear_text(&mut self) {
        self.calls.push(Call::ClearText);
    }
    fn show_stars(&mut self, field: &StarField) {
        self.calls.push(Call::Stars(field.star_count()));
    }
    fn clear_stars(&mut self) {
        self.calls.push(Call::ClearStars);
    }
    fn show_choices(&mut self, labels: &[String]) {
        self.calls.push(Call::Choices(labels.to_vec()));
    }
    fn hide_choices(&mut self) {
        self.calls.push(Call::HideChoices);
    }
    fn show_countdown(&mut self, secs_left: u32) {
        self.calls.push(Call::Countdown(secs_left));
    }
    fn clear_countdown(&mut self) {
        self.calls.push(Call::ClearCountdown);
    }
    fn draw_notes(&mut self, notes: &[NotePosition]) {
        for n in notes {
            match n.kind {
                NoteKind::Penalty => self.penalty_ids.insert(n.id),
                NoteKind::Regular => self.regular_ids.insert(n.id),
            };
        }
    }
}

const STEP_MS: f64 = 50.0;

fn system_with(config: GameConfig) -> QuizSystem<Recorder> {
    let _ = env_logger::builder().is_test(true).try_init();
    QuizSystem::new(config, KanjiBank::bundled(), Recorder::default()).unwrap()
}

fn fast(seed: u64) -> QuizSystem<Recorder> {
    system_with(GameConfig {
        seed: Some(seed),
        question_delay_min_ms: 1000.0,
        question_delay_span_ms: 1000.0,
        ..GameConfig::default()
    })
}

fn run_until(
    sys: &mut QuizSystem<Recorder>,
    now: &mut f64,
    limit_ms: f64,
    pred: impl Fn(&QuizSystem<Recorder>) -> bool,
) -> bool {
    let end = *now + limit_ms;
    while *now < end {
        *now += STEP_MS;
        sys.tick(*now);
        if pred(sys) {
            return true;
        }
    }
    false
}

fn answering(sys: &QuizSystem<Recorder>) -> bool {
    sys.phase() == Phase::Answering
}

fn correct_index(sys: &QuizSystem<Recorder>) -> usize {
    let c = sys.choices().expect("choices offered");
    c.options.iter().position(|a| *a == c.correct).unwrap()
}

fn wrong_index(sys: &QuizSystem<Recorder>) -> usize {
    let c = sys.choices().expect("choices offered");
    c.options.iter().position(|a| *a != c.correct).unwrap()
}

#[test]
fn first_question_is_scheduled_inside_delay_window() {
    let mut sys = system_with(GameConfig { seed: Some(1), ..GameConfig::default() });
    sys.start(0.0);
    assert!(sys.is_running());
    assert_eq!(sys.phase(), Phase::Scheduled);
    let at = sys.next_question_at().unwrap();
    assert!((10_000.0..120_000.0).contains(&at), "at = {at}");
    assert_eq!(sys.streak(), 0);

    sys.tick(2999.0);
    assert!(sys.notes().is_empty());
    sys.tick(3000.0);
    assert_eq!(sys.notes().notes().len(), 1);
}

#[test]
fn kanji_round_reveals_glyph_then_offers_choices() {
    let mut sys = fast(2);
    sys.start_with(QuizKind::Kanji, 0.0);
    let t0 = sys.next_question_at().unwrap();

    sys.tick(t0);
    assert_eq!(sys.phase(), Phase::Revealing);
    let Some(Reveal::Glyph(glyph)) = sys.question().map(|q| q.reveal.clone()) else {
        panic!("kanji reveal expected");
    };
    assert!(sys.stage().calls.contains(&Call::Play(Sound::Prompt)));
    assert_eq!(sys.stage().calls.last(), Some(&Call::Text(glyph)));

    sys.tick(t0 + 1000.0);
    assert_eq!(sys.stage().calls.last(), Some(&Call::ClearText));

    sys.tick(t0 + 10_999.0);
    assert_eq!(sys.phase(), Phase::Revealing);
    sys.tick(t0 + 11_000.0);
    assert_eq!(sys.phase(), Phase::Answering);
    assert!(sys.stage().calls.contains(&Call::Play(Sound::Option)));

    let choices = sys.choices().unwrap().clone();
    let Answer::Number(correct) = choices.correct else { panic!() };
    let mut nums: Vec<u32> = choices
        .options
        .iter()
        .map(|a| match a {
            Answer::Number(n) => *n,
            Answer::Emoji(_) => unreachable!(),
        })
        .collect();
    nums.sort_unstable();
    assert_eq!(nums[1], nums[0] + 1);
    assert_eq!(nums[2], nums[0] + 2);
    assert!(nums.contains(&correct));
    assert!(nums[0] >= 10);
    assert_eq!(sys.stage().calls.last(), Some(&Call::Choices(choices.labels())));
}

#[test]
fn correct_answer_grows_streak_and_rerolls_speed() {
    let mut sys = fast(3);
    sys.start(0.0);
    let mut now = 0.0;
    assert!(run_until(&mut sys, &mut now, 60_000.0, answering));

    let idx = correct_index(&sys);
    assert!(sys.answer(idx, now).unwrap());
    assert_eq!(sys.streak(), 1);
    assert_eq!(sys.stats().answered, 1);
    assert_eq!(sys.stats().correct, 1);
    assert_eq!(sys.phase(), Phase::Scheduled);
    assert!(sys.stage().calls.contains(&Call::Play(Sound::Correct)));
    match sys.notes().mode() {
        SpawnMode::Continuous { interval_ms, .. } => {
            assert!([5000.0, 4000.0, 3000.0, 2500.0].contains(&interval_ms));
        }
        other => panic!("expected continuous notes, got {other:?}"),
    }
}

#[test]
fn wrong_answer_resets_streak_and_plays_penalty_burst() {
    let mut sys = fast(4);
    sys.start(0.0);
    let mut now = 0.0;
    for _ in 0..2 {
        assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
        let idx = correct_index(&sys);
        sys.answer(idx, now).unwrap();
    }
    assert_eq!(sys.streak(), 2);

    assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
    let idx = wrong_index(&sys);
    assert!(!sys.answer(idx, now).unwrap());
    assert_eq!(sys.streak(), 0);
    assert_eq!(sys.phase(), Phase::Penalty);
    assert!(sys.notes().is_empty());
    assert!(sys.stage().calls.contains(&Call::Play(Sound::Error)));

    let drained = run_until(&mut sys, &mut now, 60_000.0, |s| {
        assert_eq!(s.streak(), 0);
        s.phase() == Phase::Scheduled
    });
    assert!(drained);
    assert_eq!(sys.stage().penalty_ids.len(), 20);
    assert!(matches!(sys.notes().mode(), SpawnMode::Continuous { .. }));

    // still zero through the whole next round until it is answered
    assert!(run_until(&mut sys, &mut now, 60_000.0, |s| {
        assert_eq!(s.streak(), 0);
        answering(s)
    }));
    let idx = correct_index(&sys);
    sys.answer(idx, now).unwrap();
    assert_eq!(sys.streak(), 1);
    assert_eq!(sys.stats().answered, 4);
    assert_eq!(sys.stats().correct, 3);
}

#[test]
fn countdown_runs_out_as_a_wrong_answer() {
    let mut sys = fast(5);
    sys.start_with(QuizKind::Kanji, 0.0);
    let t0 = sys.next_question_at().unwrap();
    sys.tick(t0);
    let shown = t0 + 11_000.0;
    sys.tick(shown);
    assert_eq!(sys.phase(), Phase::Answering);

    for (k, left) in (1..=5).zip([5, 4, 3, 2, 1]) {
        sys.tick(shown + k as f64 * 1000.0);
        assert_eq!(sys.stage().calls.last(), Some(&Call::Countdown(left)));
        assert_eq!(sys.phase(), Phase::Answering);
    }
    sys.tick(shown + 6000.0);
    assert_eq!(sys.phase(), Phase::Penalty);
    assert_eq!(sys.streak(), 0);
    assert_eq!(sys.stats().answered, 1);
    assert_eq!(sys.stats().correct, 0);
    let calls = &sys.stage().calls;
    assert!(calls.contains(&Call::ClearCountdown));
    assert!(calls.contains(&Call::HideChoices));
    assert_eq!(calls.last(), Some(&Call::Play(Sound::Error)));
}

#[test]
fn late_frame_replays_every_deadline() {
    let mut sys = fast(6);
    sys.start_with(QuizKind::Kanji, 0.0);
    let t0 = sys.next_question_at().unwrap();
    sys.tick(t0 + 20_000.0);
    assert_eq!(sys.phase(), Phase::Penalty);
    let countdowns: Vec<u32> = sys
        .stage()
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Countdown(n) => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(countdowns, vec![5, 4, 3, 2, 1]);
    assert_eq!(sys.stage().count(&Call::Play(Sound::Error)), 1);
}

#[test]
fn answers_outside_choice_phase_are_rejected() {
    let mut sys = fast(7);
    assert!(matches!(sys.answer(0, 0.0), Err(QuizError::NotRunning)));
    sys.start(0.0);
    assert!(matches!(sys.answer(0, 10.0), Err(QuizError::NotAcceptingAnswers)));

    let mut now = 10.0;
    assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
    assert!(matches!(
        sys.answer(3, now),
        Err(QuizError::ChoiceOutOfRange { index: 3, len: 3 })
    ));
    assert_eq!(sys.phase(), Phase::Answering);
}

#[test]
fn hard_questions_appear_with_streak_and_revert_after_answer() {
    let mut sys = fast(8);
    sys.start(0.0);
    let mut now = 0.0;
    let mut hard_rounds = 0;
    for round in 0..30 {
        assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
        let mode = sys.question().unwrap().mode;
        if round == 0 {
            assert_eq!(mode, Mode::Normal, "streak 0 must never be hard");
        }
        let idx = correct_index(&sys);
        sys.answer(idx, now).unwrap();
        if mode == Mode::Hard {
            hard_rounds += 1;
            assert_eq!(sys.stage().last_mode(), Some(Mode::Normal));
        }
    }
    assert_eq!(sys.streak(), 30);
    assert_eq!(sys.hard_probability(), 0.60);
    assert!(hard_rounds >= 5, "hard_rounds = {hard_rounds}");
}

#[test]
fn emoji_round_shows_each_item_and_latest_wins() {
    let mut sys = fast(9);
    sys.start_with(QuizKind::Emoji, 0.0);
    let mut now = 0.0;
    assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
    let Some(Reveal::Sequence { items, .. }) = sys.question().map(|q| q.reveal.clone()) else {
        panic!("emoji reveal expected");
    };
    for item in &items {
        assert_eq!(sys.stage().count(&Call::Text(item.to_string())), 1);
    }
    let choices = sys.choices().unwrap();
    let index_of = |a: &Answer| match a {
        Answer::Emoji(e) => items.iter().position(|i| i == e).unwrap(),
        Answer::Number(_) => unreachable!(),
    };
    let latest = choices.options.iter().map(index_of).max().unwrap();
    assert_eq!(index_of(&choices.correct), latest);
}

#[test]
fn math_round_flashes_stars_matching_answer() {
    let mut sys = fast(10);
    sys.start_with(QuizKind::Math, 0.0);
    let mut now = 0.0;
    assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
    let Some(Answer::Number(correct)) = sys.question().and_then(|q| q.answer) else {
        panic!("math answer expected");
    };
    assert_eq!(sys.stage().count(&Call::Stars(correct)), 1);
    assert_eq!(sys.stage().count(&Call::ClearStars), 1);
    assert_eq!(sys.choices().unwrap().correct, Answer::Number(correct));
}

#[test]
fn notes_are_judged_with_hit_cue() {
    let mut sys = fast(11);
    sys.start(0.0);
    let mut now = 0.0;
    assert!(run_until(&mut sys, &mut now, 6_000.0, |s| {
        s.stage().calls.contains(&Call::Play(Sound::Hit))
    }));
    // first note spawned at 3000 and crosses the judge line 2295ms later
    assert!(now >= 5295.0 && now < 5295.0 + STEP_MS + 1.0, "hit at {now}");
    assert!(sys.stage().regular_ids.contains(&0));
    assert!(sys.stage().penalty_ids.is_empty());
}

#[test]
fn stop_clears_stage_and_freezes() {
    let mut sys = fast(12);
    sys.start(0.0);
    let mut now = 0.0;
    assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
    sys.stop();
    assert!(!sys.is_running());
    assert_eq!(sys.phase(), Phase::Idle);
    assert!(sys.notes().is_empty());
    assert_eq!(sys.quiz_kind(), None);
    let before = sys.stage().calls.len();
    sys.tick(now + 100_000.0);
    assert_eq!(sys.stage().calls.len(), before);

    // restarting begins a fresh session
    sys.start(now);
    assert_eq!(sys.phase(), Phase::Scheduled);
    assert_eq!(sys.stats().answered, 0);
}

fn hits_around_error(calls: &[Call]) -> (usize, usize) {
    let err = calls
        .iter()
        .position(|c| *c == Call::Play(Sound::Error))
        .expect("error cue");
    let hits = |cs: &[Call]| cs.iter().filter(|c| **c == Call::Play(Sound::Hit)).count();
    (hits(&calls[..err]), hits(&calls[err + 1..]))
}

#[test]
fn one_long_frame_plays_like_small_steps() {
    let mut late = system_with(GameConfig { seed: Some(13), ..GameConfig::default() });
    let mut fine = system_with(GameConfig { seed: Some(13), ..GameConfig::default() });
    late.start_with(QuizKind::Kanji, 0.0);
    fine.start_with(QuizKind::Kanji, 0.0);
    let t0 = late.next_question_at().unwrap();
    assert_eq!(fine.next_question_at(), Some(t0));
    let end = t0 + 30_000.0;

    late.tick(end);
    let mut now = 0.0;
    while now < end {
        now += 10.0;
        fine.tick(now.min(end));
    }

    assert_eq!(late.stage().calls, fine.stage().calls);
    assert_eq!(late.phase(), Phase::Penalty);

    let judge_ms = 3000.0 * 0.765;
    let timeout_at = t0 + 17_000.0;
    let regular_before = (1..)
        .take_while(|k| 3000.0 * *k as f64 + judge_ms <= timeout_at)
        .count();
    let (before, after) = hits_around_error(&late.stage().calls);
    assert_eq!(before, regular_before);
    // penalty notes every 700ms from timeout + 10; only those are judged afterwards
    assert_eq!(after, 15);
    assert_eq!(late.notes().spawned_in_run(), 18);
    assert!(late.notes().notes().iter().all(|n| n.kind == NoteKind::Penalty));
}

#[test]
fn penalty_drain_waits_two_delays_and_keeps_the_quiz() {
    let mut sys = fast(14);
    sys.start_with(QuizKind::Math, 0.0);
    let mut now = 0.0;
    assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
    let idx = wrong_index(&sys);
    sys.answer(idx, now).unwrap();
    let answered_at = now;

    assert!(run_until(&mut sys, &mut now, 60_000.0, |s| s.phase() == Phase::Scheduled));
    // 20 notes every 700ms from +10; the last clears before the check at +2500
    let drained_at = answered_at + 10.0 + 20.0 * 700.0 + 2500.0;
    let at = sys.next_question_at().unwrap();
    assert!(
        at >= drained_at + 2000.0 - 1e-6 && at < drained_at + 4000.0,
        "question at {at}, drained at {drained_at}"
    );
    assert_eq!(sys.quiz_kind(), Some(QuizKind::Math));

    assert!(run_until(&mut sys, &mut now, 10_000.0, |s| s.phase() == Phase::Revealing));
    assert_eq!(sys.question().unwrap().kind, QuizKind::Math);
}

#[test]
fn timed_out_hard_question_keeps_its_frame() {
    let mut sys = fast(15);
    sys.start(0.0);
    let mut now = 0.0;
    for _ in 0..40 {
        assert!(run_until(&mut sys, &mut now, 60_000.0, answering));
        if sys.question().unwrap().mode == Mode::Hard {
            assert!(run_until(&mut sys, &mut now, 7_000.0, |s| s.phase() == Phase::Penalty));
            assert_eq!(sys.stage().last_mode(), Some(Mode::Hard));
            assert_eq!(sys.streak(), 0);
            return;
        }
        let idx = correct_index(&sys);
        sys.answer(idx, now).unwrap();
    }
    panic!("no hard question in 40 rounds");
}
