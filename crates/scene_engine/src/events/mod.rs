//! Synchronous change notification
//!
//! Components that need to observe each other's mutations register a handler
//! with the emitting component's `Notifier`:
//! - Registration returns a `SubscriptionId` that the subscriber must hand back
//!   on teardown
//! - Delivery is immediate, on the calling thread, in registration order
//! - Handlers must not re-enter the emitter; heavy work is queued elsewhere

use std::fmt;

/// Handle identifying one registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Event handler trait
pub trait EventHandler<E> {
    /// Handle an event
    fn on_event(&mut self, event: &E);
}

impl<E, F> EventHandler<E> for F
where
    F: FnMut(&E),
{
    fn on_event(&mut self, event: &E) {
        self(event);
    }
}

/// Registry of handlers for one event type
pub struct Notifier<E> {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Box<dyn EventHandler<E>>)>,
}

impl<E> Notifier<E> {
    /// Create a notifier with no subscribers
    pub fn new() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    /// Register a handler; it receives every event until unsubscribed
    pub fn subscribe(&mut self, handler: impl EventHandler<E> + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    /// Deliver an event to every handler
    pub fn notify(&mut self, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler.on_event(event);
        }
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}
