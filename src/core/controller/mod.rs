/// Dialogue controllers: thin policies over a `DialogueSession`.
///
/// Every controller implements `DialogueFlow`. Branching and voiced
/// controllers add the `Branching` and `Voiced` capabilities.
use thiserror::Error;

use crate::core::session::{DialogueSession, SessionError};

pub mod branching;
pub mod linear;
pub mod voice;

pub use branching::{BranchingController, OptionEntry};
pub use linear::LinearController;
pub use voice::VoiceController;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("controller '{0}' has no dialogue session")]
    MissingSession(String),
    #[error("unknown option key: {0}")]
    UnknownOption(String),
    #[error("no voice clip for line {0}")]
    UnknownVoiceIndex(usize),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

fn require_session<'a>(
    name: &str,
    session: Option<&'a DialogueSession>,
) -> Result<&'a DialogueSession, ControllerError> {
    session.ok_or_else(|| {
        tracing::error!(controller = name, "dialogue session missing");
        ControllerError::MissingSession(name.to_string())
    })
}

/// Base contract shared by all controllers.
pub trait DialogueFlow {
    /// Name used for session lookup and in logs.
    fn name(&self) -> &str;

    /// Short label for the controller variant.
    fn kind(&self) -> &'static str;

    fn session(&self) -> Option<&DialogueSession>;

    /// Supply the session after a failed lookup.
    fn attach_session(&mut self, session: DialogueSession);

    fn start_dialogue(&mut self) -> Result<(), ControllerError> {
        let session = require_session(self.name(), self.session())?;
        session.start()?;
        tracing::info!(controller = self.name(), kind = self.kind(), "dialogue started");
        Ok(())
    }

    fn skip_dialogue(&mut self) -> Result<(), ControllerError> {
        let session = require_session(self.name(), self.session())?;
        session.skip()?;
        tracing::info!(controller = self.name(), kind = self.kind(), "dialogue skipped");
        Ok(())
    }
}

/// Offers a set of options and jumps to the chosen content.
pub trait Branching: DialogueFlow {
    /// Put every option with a target on the choice surface. Returns how
    /// many were offered.
    fn show_options(&mut self) -> usize;

    fn hide_options(&mut self);

    /// Switch the session to the option's target and hide the options.
    fn choose_option(&mut self, key: &str) -> Result<(), ControllerError>;

    /// Offer the options whenever the session ends. Calling this again
    /// while already armed changes nothing.
    fn show_options_after_dialogue(&mut self) -> Result<(), ControllerError>;
}

/// Plays a clip for each line as it is shown.
pub trait Voiced: DialogueFlow {
    fn play_voice(&mut self, line_index: usize) -> Result<(), ControllerError>;
}

/// Any controller, for hosts that pick the variant from configuration.
#[derive(Debug)]
pub enum SceneController {
    Linear(LinearController),
    Branching(BranchingController),
    Voice(VoiceController),
}

impl SceneController {
    fn inner(&self) -> &dyn DialogueFlow {
        match self {
            Self::Linear(c) => c,
            Self::Branching(c) => c,
            Self::Voice(c) => c,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DialogueFlow {
        match self {
            Self::Linear(c) => c,
            Self::Branching(c) => c,
            Self::Voice(c) => c,
        }
    }

    pub fn as_branching(&mut self) -> Option<&mut BranchingController> {
        match self {
            Self::Branching(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_voice(&mut self) -> Option<&mut VoiceController> {
        match self {
            Self::Voice(c) => Some(c),
            _ => None,
        }
    }
}

impl DialogueFlow for SceneController {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn kind(&self) -> &'static str {
        self.inner().kind()
    }

    fn session(&self) -> Option<&DialogueSession> {
        self.inner().session()
    }

    fn attach_session(&mut self, session: DialogueSession) {
        self.inner_mut().attach_session(session);
    }

    fn start_dialogue(&mut self) -> Result<(), ControllerError> {
        self.inner_mut().start_dialogue()
    }

    fn skip_dialogue(&mut self) -> Result<(), ControllerError> {
        self.inner_mut().skip_dialogue()
    }
}
