/// Session notifications and a multicast bus with scoped subscriptions.
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::schema::content::Line;

/// Something the session wants its listeners to know about.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueEvent {
    Started,
    LineChanged { line: Line, index: usize },
    Ended,
}

impl DialogueEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::LineChanged { .. } => "line_changed",
            Self::Ended => "ended",
        }
    }
}

type Listener = Rc<dyn Fn(&DialogueEvent)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Synchronous multicast bus. Listeners run in subscription order.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Rc<RefCell<Listeners>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// `Subscription` is dropped.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DialogueEvent) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Rc::new(listener)));
        Subscription {
            id,
            bus: Rc::downgrade(&self.listeners),
        }
    }

    /// Deliver `event` to every listener registered when the call began.
    ///
    /// Listeners may subscribe or unsubscribe (including themselves) while
    /// the event is being delivered; changes apply from the next emit.
    pub fn emit(&self, event: &DialogueEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        tracing::trace!(event = event.name(), listeners = snapshot.len(), "emit");
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

/// Guard for one registered listener. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    bus: Weak<RefCell<Listeners>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the listener is still registered on a live bus.
    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .map(|bus| bus.borrow().entries.iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            // emit releases its borrow before calling listeners.
            if let Ok(mut listeners) = bus.try_borrow_mut() {
                listeners.entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
