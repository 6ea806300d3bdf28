//! Browser surface: a DOM-backed [`Stage`] plus the wasm-bindgen entry points.
//!
//! Expected page elements: `#game-area` (note lane), `#kanji-square` with a
//! `.kanji-character` inside, `#button-area` holding three `.choice-button`s,
//! and `<audio>` elements `#hit #pro #correct #error #option`.
use std::collections::{HashMap, HashSet};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlAudioElement, HtmlElement, window};

use crate::config::GameConfig;
use crate::controller::QuizSystem;
use crate::notes::{NoteId, NoteKind, NotePosition};
use crate::quiz::{KanjiBank, Mode, StarField};
use crate::stage::{Sound, Stage};

// HTMLMediaElement.HAVE_CURRENT_DATA
const HAVE_CURRENT_DATA: u16 = 2;
const MODE_SWITCH_DELAY_MS: i32 = 50;
const STAR_SIZE_PX: f64 = 60.0;
const STAR_MARGIN: f64 = 0.1;
// Note width relative to the viewport; a note leaves fully past the left edge.
const NOTE_EXIT: f64 = 0.133;

fn missing(what: &str) -> JsValue {
    JsValue::from_str(&format!("missing element {what}"))
}

fn by_id<T: JsCast>(doc: &Document, id: &str) -> Result<T, JsValue> {
    doc.get_element_by_id(id)
        .ok_or_else(|| missing(id))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{id} has an unexpected type")))
}

fn query<T: JsCast>(doc: &Document, selector: &str) -> Result<T, JsValue> {
    doc.query_selector(selector)?
        .ok_or_else(|| missing(selector))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("{selector} has an unexpected type")))
}

fn audio(doc: &Document, id: &str) -> Option<HtmlAudioElement> {
    let el = doc.get_element_by_id(id)?.dyn_into::<HtmlAudioElement>().ok();
    if el.is_none() {
        log::warn!("audio #{id} not found, cue will be silent");
    }
    el
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn performance_now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

pub struct DomStage {
    document: Document,
    game_area: HtmlElement,
    quiz_square: HtmlElement,
    quiz_character: HtmlElement,
    button_area: HtmlElement,
    buttons: Vec<HtmlElement>,
    hit: Option<HtmlAudioElement>,
    prompt: Option<HtmlAudioElement>,
    option: Option<HtmlAudioElement>,
    correct: Option<HtmlAudioElement>,
    error: Option<HtmlAudioElement>,
    stars: Vec<Element>,
    notes: HashMap<NoteId, HtmlElement>,
    // rejection handler for blocked autoplay
    ignore_rejection: Closure<dyn FnMut(JsValue)>,
}

impl DomStage {
    pub fn attach() -> Result<Self, JsValue> {
        let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
        let doc = win
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let list = doc.query_selector_all(".choice-button")?;
        let mut buttons = Vec::with_capacity(list.length() as usize);
        for i in 0..list.length() {
            if let Some(button) = list.item(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) {
                buttons.push(button);
            }
        }
        if buttons.len() < 3 {
            return Err(JsValue::from_str("expected three .choice-button elements"));
        }

        let stage = Self {
            game_area: by_id(&doc, "game-area")?,
            quiz_square: by_id(&doc, "kanji-square")?,
            quiz_character: query(&doc, ".kanji-character")?,
            button_area: by_id(&doc, "button-area")?,
            buttons,
            hit: audio(&doc, "hit"),
            prompt: audio(&doc, "pro"),
            option: audio(&doc, "option"),
            correct: audio(&doc, "correct"),
            error: audio(&doc, "error"),
            stars: Vec::new(),
            notes: HashMap::new(),
            ignore_rejection: Closure::wrap(Box::new(|_: JsValue| {}) as Box<dyn FnMut(JsValue)>),
            document: doc,
        };
        for el in [&stage.hit, &stage.prompt].into_iter().flatten() {
            el.set_volume(0.7);
            el.load();
        }
        Ok(stage)
    }

    fn set_display(el: &HtmlElement, value: &str) {
        el.style().set_property("display", value).ok();
    }

    fn spawn_note(&self, kind: NoteKind) -> Option<HtmlElement> {
        let el: HtmlElement = self.document.create_element("div").ok()?.dyn_into().ok()?;
        el.class_list().add_1("circle").ok();
        if kind == NoteKind::Penalty {
            let style = el.style();
            style
                .set_property(
                    "background",
                    "radial-gradient(circle, #FF6666 0%, #FF3333 30%, #CC1111 70%, #881111 100%)",
                )
                .ok();
            style.set_property("border-color", "#FF6666").ok();
            style
                .set_property(
                    "box-shadow",
                    "0 0 60px rgba(255, 102, 102, 0.7), inset 0 0 30px rgba(255, 255, 255, 0.3)",
                )
                .ok();
        }
        self.game_area.append_child(&el).ok()?;
        Some(el)
    }
}

impl Stage for DomStage {
    fn play(&mut self, sound: Sound) {
        let el = match sound {
            Sound::Hit => &self.hit,
            Sound::Prompt => &self.prompt,
            Sound::Option => &self.option,
            Sound::Correct => &self.correct,
            Sound::Error => &self.error,
        };
        let Some(el) = el else { return };
        // the prompt cue plays even before the element has buffered
        if sound != Sound::Prompt && el.ready_state() < HAVE_CURRENT_DATA {
            return;
        }
        el.set_current_time(0.0);
        match el.play() {
            Ok(promise) => {
                let _ = promise.catch(&self.ignore_rejection);
            }
            Err(e) => log::debug!("{sound:?} playback failed: {e:?}"),
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        let classes = self.quiz_square.class_list();
        classes.remove_2("normal-mode", "hard-mode").ok();
        let class = match mode {
            Mode::Hard => "hard-mode",
            Mode::Normal => "normal-mode",
        };
        // re-adding on a later task restarts the CSS colour transition
        let square = self.quiz_square.clone();
        let add = Closure::once_into_js(move || {
            square.class_list().add_1(class).ok();
        });
        if let Some(w) = window() {
            w.set_timeout_with_callback_and_timeout_and_arguments_0(
                add.unchecked_ref(),
                MODE_SWITCH_DELAY_MS,
            )
            .ok();
        }
    }

    fn show_text(&mut self, text: &str) {
        self.quiz_character.set_text_content(Some(text));
    }

    fn clear_text(&mut self) {
        self.quiz_character.set_text_content(Some(""));
    }

    fn show_stars(&mut self, field: &StarField) {
        self.clear_stars();
        let rect = self.quiz_square.get_bounding_client_rect();
        let (w, h) = (rect.width(), rect.height());
        let (mx, my) = (w * STAR_MARGIN, h * STAR_MARGIN);
        let (aw, ah) = (w - 2.0 * mx, h - 2.0 * my);
        let half = STAR_SIZE_PX / 2.0;
        for (cx, cy) in field.star_centres() {
            let Ok(star) = self.document.create_element("div") else {
                continue;
            };
            star.set_class_name("math-star");
            let style = format!(
                "position:absolute; left:{:.1}px; top:{:.1}px; width:{s}px; height:{s}px; font-size:{s}px; line-height:{s}px; color:#FFD700; text-align:center; text-shadow:0 0 25px rgba(255, 215, 0, 0.9), 0 6px 12px rgba(0, 0, 0, 0.4);",
                mx + cx * aw - half,
                my + cy * ah - half,
                s = STAR_SIZE_PX
            );
            star.set_attribute("style", &style).ok();
            star.set_text_content(Some("★"));
            if self.quiz_square.append_child(&star).is_ok() {
                self.stars.push(star);
            }
        }
    }

    fn clear_stars(&mut self) {
        for star in self.stars.drain(..) {
            star.remove();
        }
    }

    fn show_choices(&mut self, labels: &[String]) {
        for (button, label) in self.buttons.iter().zip(labels) {
            button.set_text_content(Some(label));
        }
        Self::set_display(&self.button_area, "flex");
    }

    fn hide_choices(&mut self) {
        Self::set_display(&self.button_area, "none");
    }

    fn show_countdown(&mut self, secs_left: u32) {
        self.quiz_character.class_list().add_1("countdown").ok();
        self.quiz_character
            .set_text_content(Some(&secs_left.to_string()));
    }

    fn clear_countdown(&mut self) {
        self.quiz_character.class_list().remove_1("countdown").ok();
        self.quiz_character.set_text_content(Some(""));
    }

    fn draw_notes(&mut self, notes: &[NotePosition]) {
        let live: HashSet<NoteId> = notes.iter().map(|n| n.id).collect();
        self.notes.retain(|id, el| {
            let keep = live.contains(id);
            if !keep {
                el.remove();
            }
            keep
        });
        if notes.is_empty() {
            return;
        }
        let start_x = self.game_area.client_width() as f64;
        let viewport = window()
            .and_then(|w| w.inner_width().ok())
            .and_then(|v| v.as_f64())
            .unwrap_or(start_x);
        let end_x = -viewport * NOTE_EXIT;
        for note in notes {
            if !self.notes.contains_key(&note.id) {
                match self.spawn_note(note.kind) {
                    Some(el) => {
                        self.notes.insert(note.id, el);
                    }
                    None => continue,
                }
            }
            if let Some(el) = self.notes.get(&note.id) {
                let x = start_x + (end_x - start_x) * note.progress;
                el.style().set_property("left", &format!("{x:.1}px")).ok();
            }
        }
    }
}

// --- Entry points ------------------------------------------------------------

thread_local! {
    static GAME: std::cell::RefCell<Option<QuizSystem<DomStage>>> = const { std::cell::RefCell::new(None) };
    static WIRED: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Start a session. `config_json` overrides timings; `kanji_json` replaces the
/// bundled kanji list (`{"kanji": [...], "hardKanji": [...]}`).
#[wasm_bindgen]
pub fn start_game(config_json: Option<String>, kanji_json: Option<String>) -> Result<(), JsValue> {
    let running = GAME.with(|g| g.borrow().as_ref().is_some_and(|s| s.is_running()));
    if running {
        return Ok(());
    }
    let config = match config_json {
        Some(json) => GameConfig::from_json(&json).map_err(to_js)?,
        None => GameConfig::default(),
    };
    let bank = KanjiBank::load_or_bundled(kanji_json.as_deref());
    let stage = DomStage::attach()?;
    let buttons = stage.buttons.clone();
    let mut system = QuizSystem::new(config, bank, stage).map_err(to_js)?;
    system.start(performance_now());
    GAME.with(|g| g.replace(Some(system)));

    if !WIRED.with(|w| w.replace(true)) {
        wire_buttons(&buttons)?;
        start_game_loop();
    }
    Ok(())
}

#[wasm_bindgen]
pub fn stop_game() {
    GAME.with(|g| {
        if let Some(system) = g.borrow_mut().as_mut() {
            system.stop();
        }
    });
}

/// Programmatic answer (same as clicking button `index`).
#[wasm_bindgen]
pub fn answer_choice(index: usize) -> Result<bool, JsValue> {
    let now = performance_now();
    GAME.with(|g| match g.borrow_mut().as_mut() {
        Some(system) => system.answer(index, now).map_err(to_js),
        None => Err(JsValue::from_str("game not started")),
    })
}

#[wasm_bindgen]
pub fn streak() -> u32 {
    GAME.with(|g| g.borrow().as_ref().map_or(0, |s| s.streak()))
}

fn wire_buttons(buttons: &[HtmlElement]) -> Result<(), JsValue> {
    for (index, button) in buttons.iter().enumerate() {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::MouseEvent| {
            let now = performance_now();
            GAME.with(|g| {
                if let Some(system) = g.borrow_mut().as_mut() {
                    match system.answer(index, now) {
                        Ok(correct) => log::debug!("choice {index} -> {correct}"),
                        Err(e) => log::debug!("click on choice {index} ignored: {e}"),
                    }
                }
            });
        }) as Box<dyn FnMut(_)>);
        button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

type FrameCallback = std::rc::Rc<std::cell::RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn request_frame(callback: &FrameCallback) {
    if let (Some(w), Some(cb)) = (window(), callback.borrow().as_ref()) {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}

fn start_game_loop() {
    let f: FrameCallback = std::rc::Rc::new(std::cell::RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        GAME.with(|cell| {
            if let Some(system) = cell.borrow_mut().as_mut() {
                system.tick(ts);
            }
        });
        request_frame(&f);
    }) as Box<dyn FnMut(f64)>));
    request_frame(&g);
}
