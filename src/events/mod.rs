//! In-process event bus.
//!
//! Subscription and creation lifecycle changes fan out to registered
//! listeners strictly *after* the primary session has committed. Delivery
//! is synchronous; a failing listener is logged and isolated: it neither
//! undoes the primary commit nor aborts its peers.
//!
//! The bus is an explicit registry owned by the composition root, not a
//! process-global hidden in module state.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use crate::error::GridtResult;
use crate::models::{MovementId, UserId};

/// The event kinds the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A subscription row was committed.
    Subscribe,
    /// A subscription row was ended.
    Unsubscribe,
    /// A creation row was committed.
    Creation,
    /// A creation row was ended.
    RemoveCreation,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Subscribe => "onSubscribe",
            Self::Unsubscribe => "onUnsubscribe",
            Self::Creation => "onCreation",
            Self::RemoveCreation => "onRemoveCreation",
        };
        f.write_str(name)
    }
}

/// A listener invoked with the (user, movement) pair of the event.
pub type Listener = Box<dyn Fn(UserId, MovementId) -> GridtResult<()> + Send + Sync>;

struct NamedListener {
    name: String,
    listener: Listener,
}

/// Registry of listeners per event kind.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, Vec<NamedListener>>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for an event kind. Listeners are registered at
    /// startup, before any emission.
    pub fn register(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        listener: impl Fn(UserId, MovementId) -> GridtResult<()> + Send + Sync + 'static,
    ) {
        let mut guard = self.listeners.write().expect("event bus lock");
        guard.entry(kind).or_default().push(NamedListener {
            name: name.into(),
            listener: Box::new(listener),
        });
    }

    /// Delivers the event to every listener of its kind.
    ///
    /// Must only be called after the primary session committed. Failures
    /// are logged per listener and never propagate.
    pub fn emit(&self, kind: EventKind, user_id: UserId, movement_id: MovementId) {
        let guard = self.listeners.read().expect("event bus lock");
        let Some(listeners) = guard.get(&kind) else {
            return;
        };
        for entry in listeners {
            if let Err(err) = (entry.listener)(user_id, movement_id) {
                tracing::error!(
                    event = %kind,
                    listener = %entry.name,
                    user = %user_id,
                    movement = %movement_id,
                    error = %err,
                    "event listener failed"
                );
            }
        }
    }

    /// Number of listeners registered for a kind.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .expect("event bus lock")
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.listeners.read().expect("event bus lock");
        let mut map = f.debug_map();
        for (kind, listeners) in guard.iter() {
            let names: Vec<&str> = listeners.iter().map(|l| l.name.as_str()).collect();
            map.entry(kind, &names);
        }
        map.finish()
    }
}
