/// Scene-wide session registry, consulted only while controllers are being
/// wired up.
use rustc_hash::FxHashMap;

use crate::core::session::DialogueSession;

/// Sessions registered by owner name.
///
/// The first registered session is the scene default.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: FxHashMap<String, DialogueSession>,
    order: Vec<String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, owner: impl Into<String>, session: DialogueSession) {
        let owner = owner.into();
        if self.sessions.insert(owner.clone(), session).is_none() {
            self.order.push(owner);
        }
    }

    pub fn get(&self, owner: &str) -> Option<&DialogueSession> {
        self.sessions.get(owner)
    }

    /// The scene default: whichever session was registered first.
    pub fn primary(&self) -> Option<&DialogueSession> {
        self.order.first().and_then(|owner| self.sessions.get(owner))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Pick the session a controller named `owner` should drive.
    ///
    /// Tries, in order: the explicitly configured session, a session
    /// registered under the controller's own name, the scene default.
    /// Logs a configuration error if all three come up empty.
    pub fn resolve(
        &self,
        owner: &str,
        explicit: Option<DialogueSession>,
    ) -> Option<DialogueSession> {
        if explicit.is_some() {
            return explicit;
        }
        if let Some(session) = self.get(owner) {
            tracing::debug!(owner, "using session registered under the controller's name");
            return Some(session.clone());
        }
        if let Some(session) = self.primary() {
            tracing::info!(owner, "found dialogue session in scene");
            return Some(session.clone());
        }
        tracing::error!(owner, "no dialogue session found; dialogue cannot run");
        None
    }
}
