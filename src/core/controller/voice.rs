/// Plays a voice clip for each line the session shows.
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{require_session, ControllerError, DialogueFlow, Voiced};
use crate::core::events::{DialogueEvent, Subscription};
use crate::core::presenter::AudioPlayer;
use crate::core::registry::SessionRegistry;
use crate::core::session::DialogueSession;
use crate::schema::content::{ClipHandle, Line};
use crate::schema::mode::VoiceClipSpec;

struct VoiceState {
    clips: FxHashMap<usize, ClipHandle>,
    player: Box<dyn AudioPlayer>,
    listener: Option<Subscription>,
}

impl VoiceState {
    fn play(&mut self, line_index: usize) -> Result<(), ControllerError> {
        if self.clips.is_empty() {
            tracing::warn!("no voice clips available");
            return Err(ControllerError::UnknownVoiceIndex(line_index));
        }
        let Some(clip) = self.clips.get(&line_index).cloned() else {
            tracing::warn!(line_index, "no voice clip for line");
            return Err(ControllerError::UnknownVoiceIndex(line_index));
        };
        self.play_clip(line_index, &clip);
        Ok(())
    }

    /// Clip for a shown line: the configured one, else the line's own.
    fn play_line(&mut self, line: &Line, line_index: usize) {
        match self.clips.get(&line_index).or(line.audio.as_ref()).cloned() {
            Some(clip) => self.play_clip(line_index, &clip),
            None => tracing::warn!(line_index, "no voice clip for line"),
        }
    }

    fn play_clip(&mut self, line_index: usize, clip: &ClipHandle) {
        if self.player.is_playing() {
            self.player.stop_current();
        }
        tracing::debug!(line_index, clip = %clip, "playing voice clip");
        self.player.play_clip(clip);
    }

    fn stop(&mut self) {
        if self.player.is_playing() {
            self.player.stop_current();
        }
    }
}

/// Voice controller.
///
/// Clips are keyed by line index; when two entries name the same index
/// the later one wins. Shown lines with no entry play their own `audio`.
/// The session listener exists only between `start_dialogue` and the next
/// `ended`, and never more than once.
pub struct VoiceController {
    name: String,
    session: Option<DialogueSession>,
    state: Rc<RefCell<VoiceState>>,
}

impl fmt::Debug for VoiceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceController")
            .field("name", &self.name)
            .field("session", &self.session)
            .field("listening", &self.is_listening())
            .finish()
    }
}

impl VoiceController {
    pub fn new(
        name: impl Into<String>,
        session: Option<DialogueSession>,
        clips: &[VoiceClipSpec],
        player: impl AudioPlayer + 'static,
    ) -> Self {
        let name = name.into();
        let mut map = FxHashMap::default();
        for spec in clips {
            if map.insert(spec.line_index, spec.clip.clone()).is_some() {
                tracing::warn!(
                    controller = %name,
                    line_index = spec.line_index,
                    "duplicate voice clip index; the later clip wins"
                );
            }
        }
        Self {
            name,
            session,
            state: Rc::new(RefCell::new(VoiceState {
                clips: map,
                player: Box::new(player),
                listener: None,
            })),
        }
    }

    /// Build with the session resolved through `registry` when none is
    /// given.
    pub fn from_registry(
        name: impl Into<String>,
        explicit: Option<DialogueSession>,
        registry: &SessionRegistry,
        clips: &[VoiceClipSpec],
        player: impl AudioPlayer + 'static,
    ) -> Self {
        let name = name.into();
        let session = registry.resolve(&name, explicit);
        Self::new(name, session, clips, player)
    }

    pub fn clip_for(&self, line_index: usize) -> Option<ClipHandle> {
        self.state.borrow().clips.get(&line_index).cloned()
    }

    /// Whether the session listener is currently registered.
    pub fn is_listening(&self) -> bool {
        self.state
            .try_borrow()
            .map(|s| s.listener.is_some())
            .unwrap_or(false)
    }

    fn listen(&self, session: &DialogueSession) {
        if self.is_listening() {
            tracing::debug!(controller = %self.name, "voice listener already registered");
            return;
        }
        let state = Rc::downgrade(&self.state);
        let listener = session.subscribe(move |event| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let Ok(mut state) = state.try_borrow_mut() else {
                tracing::warn!(event = event.name(), "voice controller busy; event ignored");
                return;
            };
            match event {
                DialogueEvent::LineChanged { line, index } => state.play_line(line, *index),
                DialogueEvent::Ended => {
                    state.stop();
                    state.listener = None;
                }
                DialogueEvent::Started => {}
            }
        });
        self.state.borrow_mut().listener = Some(listener);
    }

    /// Stop playback and drop the session listener.
    pub fn teardown(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.stop();
            state.listener = None;
        }
    }
}

impl Drop for VoiceController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl DialogueFlow for VoiceController {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "voice"
    }

    fn session(&self) -> Option<&DialogueSession> {
        self.session.as_ref()
    }

    fn attach_session(&mut self, session: DialogueSession) {
        self.teardown();
        self.session = Some(session);
    }

    /// Listens before starting, so the first line's clip plays too.
    fn start_dialogue(&mut self) -> Result<(), ControllerError> {
        let session = require_session(&self.name, self.session.as_ref())?.clone();
        self.listen(&session);
        if let Err(e) = session.start() {
            self.teardown();
            return Err(e.into());
        }
        tracing::info!(controller = %self.name, "voice dialogue started");
        Ok(())
    }
}

impl Voiced for VoiceController {
    fn play_voice(&mut self, line_index: usize) -> Result<(), ControllerError> {
        self.state.borrow_mut().play(line_index)
    }
}
