use crate::connection::ConnectionState;
use crate::record::EntityRecord;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// Event kinds a consumer can subscribe to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeedEventKind {
    StatusChange,
    EntityUpdate,
    EntityRemove,
}

/// Event published to subscribers.
///
/// Records are carried by value; subscribers never hold references into
/// the live collection.
#[derive(Clone, Debug)]
pub enum FeedEvent {
    StatusChange(ConnectionState),
    EntityUpdate(EntityRecord),
    EntityRemove(EntityRecord),
}

impl FeedEvent {
    pub fn kind(&self) -> FeedEventKind {
        match self {
            FeedEvent::StatusChange(_) => FeedEventKind::StatusChange,
            FeedEvent::EntityUpdate(_) => FeedEventKind::EntityUpdate,
            FeedEvent::EntityRemove(_) => FeedEventKind::EntityRemove,
        }
    }
}

/// Subscriber callback. Handler identity is the `Arc` pointer, so the same
/// handler can be registered once and later unsubscribed by the caller.
pub type EventHandler = Arc<dyn Fn(&FeedEvent) + Send + Sync>;

/// Fan-out point between the ingestion engine and its consumers.
///
/// Dispatch is synchronous: every handler registered for the event's kind
/// runs before the triggering operation returns.
pub struct EventHub {
    handlers: DashMap<FeedEventKind, Vec<EventHandler>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register a handler for one event kind.
    ///
    /// Registering the same `Arc` twice for the same kind is a no-op; a
    /// handler is invoked at most once per dispatched event.
    pub fn subscribe(&self, kind: FeedEventKind, handler: EventHandler) {
        let mut registered = self.handlers.entry(kind).or_insert_with(Vec::new);
        if registered.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return;
        }
        registered.push(handler);
    }

    /// Remove a handler by pointer identity. Unknown handlers are a no-op.
    pub fn unsubscribe(&self, kind: FeedEventKind, handler: &EventHandler) {
        if let Some(mut registered) = self.handlers.get_mut(&kind) {
            registered.retain(|h| !Arc::ptr_eq(h, handler));
        }
    }

    /// Invoke every handler registered for the event's kind.
    ///
    /// The handler list is snapshotted first, so handlers may subscribe or
    /// unsubscribe reentrantly without deadlocking the registry.
    pub fn dispatch(&self, event: &FeedEvent) {
        let snapshot: Vec<EventHandler> = match self.handlers.get(&event.kind()) {
            Some(registered) => registered.clone(),
            None => return,
        };
        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of handlers currently registered for a kind
    pub fn handler_count(&self, kind: FeedEventKind) -> usize {
        self.handlers.get(&kind).map_or(0, |h| h.len())
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
