/// The dialogue session: line sequencing, reveal lifecycle and
/// notifications.
///
/// A session is a cheap-to-clone handle. Controllers, the host's input
/// handling and the frame loop all hold clones of the same session. State
/// changes run to completion before any listener is notified, so
/// listeners are free to call back into the session.
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::SessionConfig;
use crate::core::events::{DialogueEvent, EventBus, Subscription};
use crate::core::presenter::{NullPresenter, Presenter};
use crate::core::reveal::{RevealEngine, RevealError, RevealHandle, RevealPhase, RevealStep, RevealTask};
use crate::schema::content::{ContentId, DialogueContent, Line};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no dialogue content loaded")]
    MissingContent,
    #[error("start index {index} is past the end of content {content} ({len} lines)")]
    StartIndexOutOfRange {
        content: ContentId,
        index: usize,
        len: usize,
    },
    #[error("session is inactive")]
    Inactive,
    #[error("session re-entered while busy (from a presenter callback?)")]
    Reentrant,
    #[error("reveal error: {0}")]
    Reveal(#[from] RevealError),
}

/// What the reveal side of the session is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Revealing,
    Paused,
    Complete,
}

struct SessionState {
    content: Option<Rc<DialogueContent>>,
    /// Copy of the lines being iterated, taken when the session opens.
    lines: Vec<Line>,
    index: usize,
    active: bool,
    reveal: Option<RevealTask>,
    engine: RevealEngine,
    config: SessionConfig,
    presenter: Box<dyn Presenter>,
}

impl SessionState {
    fn reveal_state(&self) -> RevealState {
        match self.reveal.as_ref().map(RevealTask::phase) {
            Some(RevealPhase::Revealing) => RevealState::Revealing,
            Some(RevealPhase::Paused) => RevealState::Paused,
            Some(RevealPhase::Lingering | RevealPhase::Complete) => RevealState::Complete,
            Some(RevealPhase::Cancelled) | None => RevealState::Idle,
        }
    }

    fn content_id(&self) -> Option<&ContentId> {
        self.content.as_ref().map(|c| &c.id)
    }

    fn cancel_reveal(&mut self) {
        if let Some(mut task) = self.reveal.take() {
            task.cancel();
        }
    }

    /// Push reveal output to the presenter. Returns true if an
    /// auto-advance came due.
    fn render(&mut self, steps: Vec<RevealStep>) -> bool {
        let mut auto_advance = false;
        for step in steps {
            match step {
                RevealStep::Partial(text) => self.presenter.render_partial(&text),
                RevealStep::Finished(text) => self.presenter.render_final(&text),
                RevealStep::AutoAdvance => auto_advance = true,
            }
        }
        auto_advance
    }

    fn open(&mut self, index: usize) -> Result<(), SessionError> {
        let Some(content) = self.content.clone() else {
            tracing::error!("cannot open dialogue: no content loaded");
            return Err(SessionError::MissingContent);
        };
        self.cancel_reveal();
        self.lines = content.lines.clone();
        self.index = index;
        self.active = true;
        self.presenter.show();
        if self.lines.is_empty() {
            tracing::warn!(content = %content.id, "no dialogue lines to display");
        }
        Ok(())
    }

    /// Show the line at the cursor, or report that the lines ran out.
    fn step(&mut self) -> DialogueEvent {
        let Some(line) = self.lines.get(self.index).cloned() else {
            // The last line stays up until skip or switch; only a pending
            // auto-advance is dropped.
            if let Some(task) = self.reveal.as_mut().filter(|t| t.phase().is_live()) {
                task.complete();
            }
            tracing::info!(
                content = ?self.content_id(),
                "all dialogue lines have been displayed"
            );
            return DialogueEvent::Ended;
        };
        self.cancel_reveal();
        let mut task = self.engine.begin(
            &line.text,
            self.config.per_char_delay(),
            self.config.auto_advance_delay(),
        );
        let steps = task.tick(Duration::ZERO);
        self.reveal = Some(task);
        self.render(steps);
        let index = self.index;
        self.index += 1;
        tracing::debug!(content = ?self.content_id(), index, "line changed");
        DialogueEvent::LineChanged { line, index }
    }

    /// Force the current line to its full text. Returns false if nothing
    /// was mid-reveal.
    fn complete_line(&mut self) -> bool {
        let Some(task) = self.reveal.as_mut() else {
            return false;
        };
        if !matches!(task.phase(), RevealPhase::Revealing | RevealPhase::Paused) {
            return false;
        }
        if let Some(RevealStep::Finished(text)) = task.complete() {
            self.presenter.render_final(&text);
        }
        true
    }
}

/// Builder for constructing a `DialogueSession`.
pub struct DialogueSessionBuilder {
    config: SessionConfig,
    content: Option<Rc<DialogueContent>>,
    presenter: Option<Box<dyn Presenter>>,
}

impl DialogueSessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn content(mut self, content: Rc<DialogueContent>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Some(Box::new(presenter));
        self
    }

    /// Build the session. A missing presenter is reported here, once; the
    /// session then runs headless until `attach_presenter` is called.
    pub fn build(self) -> DialogueSession {
        let presenter = self.presenter.unwrap_or_else(|| {
            tracing::error!("no presenter attached; dialogue will not be displayed");
            Box::new(NullPresenter)
        });
        if let Some(ref content) = self.content {
            tracing::info!(
                content = %content.id,
                lines = content.lines.len(),
                "loaded dialogue lines"
            );
        }
        DialogueSession {
            state: Rc::new(RefCell::new(SessionState {
                content: self.content,
                lines: Vec::new(),
                index: 0,
                active: false,
                reveal: None,
                engine: RevealEngine::new(),
                config: self.config,
                presenter,
            })),
            events: EventBus::new(),
        }
    }
}

/// Handle to one dialogue session.
#[derive(Clone)]
pub struct DialogueSession {
    state: Rc<RefCell<SessionState>>,
    events: EventBus,
}

impl fmt::Debug for DialogueSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("DialogueSession");
        match self.state.try_borrow() {
            Ok(s) => d
                .field("content", &s.content_id())
                .field("index", &s.index)
                .field("active", &s.active)
                .field("reveal", &s.reveal_state()),
            Err(_) => d.field("state", &"<busy>"),
        };
        d.field("events", &self.events).finish()
    }
}

impl DialogueSession {
    pub fn builder() -> DialogueSessionBuilder {
        DialogueSessionBuilder {
            config: SessionConfig::default(),
            content: None,
            presenter: None,
        }
    }

    fn with_state<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut SessionState) -> Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            tracing::error!(op, "dialogue session re-entered while busy");
            return Err(SessionError::Reentrant);
        };
        f(&mut state)
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> Option<R> {
        self.state.try_borrow().ok().map(|s| f(&s))
    }

    /// Register a listener for `started`, `line_changed` and `ended`.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DialogueEvent) + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Open the loaded content from its first line.
    ///
    /// Shows the surface, raises `started`, then shows the first line.
    /// Empty content raises `ended` straight after `started`.
    pub fn start(&self) -> Result<(), SessionError> {
        self.with_state("start", |s| s.open(0))?;
        self.events.emit(&DialogueEvent::Started);
        self.next_line()
    }

    /// Replace the content and open it at `start_index`.
    ///
    /// An out-of-range index is rejected without touching the session.
    /// `start_index == len` opens straight into `ended`.
    pub fn switch_content(
        &self,
        content: Rc<DialogueContent>,
        start_index: usize,
    ) -> Result<(), SessionError> {
        self.with_state("switch_content", |s| {
            if start_index > content.lines.len() {
                tracing::error!(
                    content = %content.id,
                    index = start_index,
                    len = content.lines.len(),
                    "start index out of range"
                );
                return Err(SessionError::StartIndexOutOfRange {
                    content: content.id.clone(),
                    index: start_index,
                    len: content.lines.len(),
                });
            }
            tracing::info!(content = %content.id, index = start_index, "switched dialogue content");
            s.content = Some(content);
            s.open(start_index)
        })?;
        self.events.emit(&DialogueEvent::Started);
        self.next_line()
    }

    /// Jump to `index` of `content`, e.g. to return to a remembered point.
    pub fn go_to_line(&self, content: Rc<DialogueContent>, index: usize) -> Result<(), SessionError> {
        self.switch_content(content, index)
    }

    /// Replace the content without opening it. The next `start` uses it.
    pub fn set_content(&self, content: Rc<DialogueContent>) -> Result<(), SessionError> {
        self.with_state("set_content", |s| {
            tracing::info!(content = %content.id, lines = content.lines.len(), "dialogue content set");
            s.content = Some(content);
            Ok(())
        })
    }

    fn next_line(&self) -> Result<(), SessionError> {
        let event = self.with_state("advance", |s| Ok(s.step()))?;
        self.events.emit(&event);
        Ok(())
    }

    /// Move the dialogue on by one step.
    ///
    /// If the current line is still being revealed it is completed instead,
    /// so no text is ever skipped; the following call shows the next line.
    /// Once the lines run out every call raises `ended`.
    pub fn advance(&self) -> Result<(), SessionError> {
        let completed = self.with_state("advance", |s| {
            if !s.active {
                tracing::warn!("cannot advance: dialogue is not active");
                return Err(SessionError::Inactive);
            }
            Ok(s.complete_line())
        })?;
        if completed {
            return Ok(());
        }
        self.next_line()
    }

    /// Entry point for the player's "next" button. Ignored while the
    /// dialogue surface is hidden.
    pub fn request_advance(&self) -> Result<(), SessionError> {
        if !self.is_active() {
            tracing::debug!("advance requested while dialogue is hidden");
            return Ok(());
        }
        self.advance()
    }

    /// Show the rest of the current line immediately. Returns whether a
    /// line was mid-reveal.
    pub fn complete_line(&self) -> Result<bool, SessionError> {
        self.with_state("complete_line", |s| Ok(s.complete_line()))
    }

    /// Feed elapsed frame time to the active reveal.
    ///
    /// Time left over after an auto-advance goes to the next line, so one
    /// long tick plays out the same as many short ones.
    pub fn tick(&self, elapsed: Duration) -> Result<(), SessionError> {
        let mut remaining = elapsed;
        loop {
            let surplus = self.with_state("tick", |s| {
                if !s.active {
                    return Ok(None);
                }
                let Some(task) = s.reveal.as_mut() else {
                    return Ok(None);
                };
                let steps = task.tick(remaining);
                let surplus = task.surplus();
                Ok(s.render(steps).then_some(surplus))
            })?;
            let Some(surplus) = surplus else {
                return Ok(());
            };
            self.next_line()?;
            remaining = surplus;
        }
    }

    /// Suspend the reveal of the current line. Returns whether anything
    /// was revealing.
    pub fn pause(&self) -> Result<bool, SessionError> {
        self.with_state("pause", |s| {
            Ok(s.reveal.as_mut().map(RevealTask::pause).unwrap_or(false))
        })
    }

    /// Continue a paused reveal from the text already on screen.
    pub fn resume(&self) -> Result<(), SessionError> {
        self.with_state("resume", |s| {
            let Some(paused) = s.reveal.as_mut() else {
                return Ok(());
            };
            let per_char = s.config.per_char_delay();
            let mut task = s.engine.resume(paused, per_char).map_err(|e| {
                tracing::warn!(error = %e, "cannot resume reveal");
                SessionError::from(e)
            })?;
            let steps = task.tick(Duration::ZERO);
            s.reveal = Some(task);
            s.render(steps);
            Ok(())
        })
    }

    /// Stop the dialogue: finish the current line, hide the surface and
    /// raise `ended`. On an idle session only `ended` is raised.
    pub fn skip(&self) -> Result<(), SessionError> {
        self.with_state("skip", |s| {
            if s.active {
                s.complete_line();
                s.cancel_reveal();
                s.presenter.hide();
                s.active = false;
                tracing::info!(content = ?s.content_id(), "all dialogues skipped");
            }
            Ok(())
        })?;
        self.events.emit(&DialogueEvent::Ended);
        Ok(())
    }

    /// Replace the presenter, e.g. after a missing one was reported.
    pub fn attach_presenter(&self, presenter: impl Presenter + 'static) -> Result<(), SessionError> {
        self.with_state("attach_presenter", |s| {
            s.presenter = Box::new(presenter);
            Ok(())
        })
    }

    /// Change the per-character delay. Non-positive values are ignored.
    /// Applies from the next line, or from where a paused line resumes.
    pub fn set_typing_speed(&self, seconds: f32) -> Result<(), SessionError> {
        self.with_state("set_typing_speed", |s| {
            if seconds > 0.0 {
                s.config.typing_speed = seconds;
            }
            Ok(())
        })
    }

    /// Change the auto-advance delay; zero disables it. Applies from the
    /// next line.
    pub fn set_next_line_delay(&self, seconds: f32) -> Result<(), SessionError> {
        self.with_state("set_next_line_delay", |s| {
            s.config.next_line_delay = seconds.max(0.0);
            Ok(())
        })
    }

    pub fn config(&self) -> SessionConfig {
        self.read(|s| s.config).unwrap_or_default()
    }

    /// Whether the dialogue surface is shown.
    pub fn is_active(&self) -> bool {
        self.read(|s| s.active).unwrap_or(false)
    }

    /// Whether every line of the open content has been shown.
    pub fn is_ended(&self) -> bool {
        self.read(|s| s.active && s.index >= s.lines.len())
            .unwrap_or(false)
    }

    /// Index of the next line to show.
    pub fn current_index(&self) -> usize {
        self.read(|s| s.index).unwrap_or(0)
    }

    pub fn line_count(&self) -> usize {
        self.read(|s| s.lines.len()).unwrap_or(0)
    }

    pub fn content(&self) -> Option<Rc<DialogueContent>> {
        self.read(|s| s.content.clone()).flatten()
    }

    pub fn content_id(&self) -> Option<ContentId> {
        self.read(|s| s.content_id().cloned()).flatten()
    }

    pub fn reveal_state(&self) -> RevealState {
        self.read(|s| s.reveal_state()).unwrap_or(RevealState::Idle)
    }

    /// Handle to the current reveal task, if any.
    pub fn active_reveal(&self) -> Option<RevealHandle> {
        self.read(|s| s.reveal.as_ref().map(RevealTask::handle))
            .flatten()
    }

    /// Text the current reveal has put on screen so far.
    pub fn visible_text(&self) -> String {
        self.read(|s| {
            s.reveal
                .as_ref()
                .map(|t| t.visible_text().to_string())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }
}
