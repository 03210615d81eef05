/// Plays content start to finish with no extra behavior.
use super::DialogueFlow;
use crate::core::registry::SessionRegistry;
use crate::core::session::DialogueSession;

#[derive(Debug)]
pub struct LinearController {
    name: String,
    session: Option<DialogueSession>,
}

impl LinearController {
    pub fn new(name: impl Into<String>, session: DialogueSession) -> Self {
        Self {
            name: name.into(),
            session: Some(session),
        }
    }

    /// Resolve the session through `registry` when none is given.
    pub fn from_registry(
        name: impl Into<String>,
        explicit: Option<DialogueSession>,
        registry: &SessionRegistry,
    ) -> Self {
        let name = name.into();
        let session = registry.resolve(&name, explicit);
        Self { name, session }
    }

    /// Host activation hook: a linear dialogue starts as soon as its
    /// owner becomes active.
    pub fn activate(&mut self) -> Result<(), super::ControllerError> {
        self.start_dialogue()
    }
}

impl DialogueFlow for LinearController {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "linear"
    }

    fn session(&self) -> Option<&DialogueSession> {
        self.session.as_ref()
    }

    fn attach_session(&mut self, session: DialogueSession) {
        self.session = Some(session);
    }
}
