//! WASM bindings for dialogue-engine — drives the dialogue box of the web demo.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;

use dialogue_engine::core::config::SceneConfig;
use dialogue_engine::core::events::{DialogueEvent, Subscription};
use dialogue_engine::core::presenter::{AudioPlayer, ChoiceSurface, ChoiceView, Presenter};
use dialogue_engine::core::scene::Scene;
use dialogue_engine::core::store::ContentLibrary;
use dialogue_engine::schema::content::ClipHandle;

// ---------------------------------------------------------------------------
// Embedded dialogue data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const TAVERN_CONTENT: &str = include_str!("../../dialogue_data/content/tavern.ron");
    pub const BARD_CONTENT: &str = include_str!("../../dialogue_data/content/bard.ron");

    pub const TAVERN_SCENE: &str = include_str!("../../dialogue_data/scenes/tavern_scene.ron");
    pub const BARD_SCENE: &str = include_str!("../../dialogue_data/scenes/bard_scene.ron");
    pub const NOTICE_SCENE: &str = include_str!("../../dialogue_data/scenes/notice_scene.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct OptionInfo {
    key: String,
    text: String,
}

#[derive(serde::Serialize)]
struct FrameInfo<'a> {
    visible: bool,
    text: &'a str,
    speaker: Option<String>,
    content: Option<String>,
    line: usize,
    lines: usize,
    reveal: String,
    options: Vec<OptionInfo>,
    clip: Option<&'a str>,
    events: &'a [String],
}

// ---------------------------------------------------------------------------
// Browser-side surface: everything the page needs to draw the next frame
// ---------------------------------------------------------------------------
#[derive(Default)]
struct WebSurface {
    visible: bool,
    text: String,
    options: Vec<ChoiceView>,
    clip: Option<String>,
    events: Vec<String>,
}

impl Presenter for WebSurface {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn render_partial(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn render_final(&mut self, text: &str) {
        self.text = text.to_string();
    }
}

impl ChoiceSurface for WebSurface {
    fn show_choices(&mut self, choices: &[ChoiceView]) {
        self.options = choices.to_vec();
    }

    fn hide_choices(&mut self) {
        self.options.clear();
    }
}

impl AudioPlayer for WebSurface {
    fn play_clip(&mut self, clip: &ClipHandle) {
        self.clip = Some(clip.as_str().to_string());
    }

    fn stop_current(&mut self) {
        self.clip = None;
    }

    fn is_playing(&self) -> bool {
        self.clip.is_some()
    }
}

fn js_err(context: &str, e: impl std::fmt::Display) -> JsError {
    JsError::new(&format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct DialogueDemo {
    scene: Scene,
    surface: Rc<RefCell<WebSurface>>,
    _events: Subscription,
}

#[wasm_bindgen]
impl DialogueDemo {
    /// Create a demo for one of the embedded scenes.
    #[wasm_bindgen(constructor)]
    pub fn new(scene_name: &str) -> Result<DialogueDemo, JsError> {
        let scene_src = match scene_name {
            "tavern" => data::TAVERN_SCENE,
            "bard" => data::BARD_SCENE,
            "notice" => data::NOTICE_SCENE,
            _ => return Err(JsError::new(&format!("Unknown scene: {scene_name}"))),
        };
        let config = SceneConfig::parse_ron(scene_src).map_err(|e| js_err("Scene parse error", e))?;

        let mut library = ContentLibrary::new();
        for src in [data::TAVERN_CONTENT, data::BARD_CONTENT] {
            let contents =
                ContentLibrary::parse_ron(src).map_err(|e| js_err("Content parse error", e))?;
            for content in contents {
                library.register(content);
            }
        }

        let surface = Rc::new(RefCell::new(WebSurface::default()));
        let scene = Scene::build(
            scene_name,
            &config,
            &library,
            Rc::clone(&surface),
            Rc::clone(&surface),
            Rc::clone(&surface),
        )
        .map_err(|e| js_err("Scene build error", e))?;

        let log = Rc::downgrade(&surface);
        let events = scene.session.subscribe(move |event| {
            let Some(log) = log.upgrade() else {
                return;
            };
            let entry = match event {
                DialogueEvent::LineChanged { index, .. } => format!("line_changed:{index}"),
                other => other.name().to_string(),
            };
            log.borrow_mut().events.push(entry);
        });

        Ok(DialogueDemo {
            scene,
            surface,
            _events: events,
        })
    }

    pub fn start(&mut self) -> Result<(), JsError> {
        self.scene.start().map_err(|e| js_err("Start error", e))
    }

    /// The "next" button.
    pub fn next(&mut self) -> Result<(), JsError> {
        self.scene
            .session
            .request_advance()
            .map_err(|e| js_err("Advance error", e))
    }

    /// Advance time by `ms` milliseconds; call once per animation frame.
    pub fn tick(&mut self, ms: f64) -> Result<(), JsError> {
        let elapsed = Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or(Duration::ZERO);
        self.scene
            .session
            .tick(elapsed)
            .map_err(|e| js_err("Tick error", e))
    }

    pub fn skip(&mut self) -> Result<(), JsError> {
        self.scene.skip().map_err(|e| js_err("Skip error", e))
    }

    pub fn choose(&mut self, key: &str) -> Result<(), JsError> {
        self.scene.choose(key).map_err(|e| js_err("Choice error", e))
    }

    pub fn pause(&mut self) -> Result<bool, JsError> {
        self.scene.session.pause().map_err(|e| js_err("Pause error", e))
    }

    pub fn resume(&mut self) -> Result<(), JsError> {
        self.scene
            .session
            .resume()
            .map_err(|e| js_err("Resume error", e))
    }

    pub fn set_typing_speed(&mut self, seconds: f32) -> Result<(), JsError> {
        self.scene
            .session
            .set_typing_speed(seconds)
            .map_err(|e| js_err("Config error", e))
    }

    /// Everything needed to draw the dialogue box, as JSON. Events raised
    /// since the previous call are drained into `events`.
    pub fn frame(&mut self) -> Result<String, JsError> {
        let session = &self.scene.session;
        let content = session.content();
        let mut surface = self.surface.borrow_mut();
        let events = std::mem::take(&mut surface.events);
        let info = FrameInfo {
            visible: surface.visible,
            text: &surface.text,
            speaker: content.as_ref().and_then(|c| c.speaker.clone()),
            content: content.as_ref().map(|c| c.id.to_string()),
            line: session.current_index(),
            lines: session.line_count(),
            reveal: format!("{:?}", session.reveal_state()),
            options: surface
                .options
                .iter()
                .map(|c| OptionInfo {
                    key: c.key.clone(),
                    text: c.text.clone(),
                })
                .collect(),
            clip: surface.clip.as_deref(),
            events: &events,
        };
        serde_json::to_string(&info).map_err(|e| js_err("Serialization error", e))
    }

    /// Names of the embedded scenes, as a JSON array.
    pub fn available_scenes() -> String {
        serde_json::to_string(&["tavern", "bard", "notice"]).unwrap_or_else(|_| "[]".to_string())
    }
}
