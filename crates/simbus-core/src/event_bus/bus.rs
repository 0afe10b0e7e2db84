//! Event Bus implementation.
//!
//! One [`EventBus`] is bound to one event family. Every dispatch passes
//! through the injected [`DebugSession`] gate before subscribers run, so a
//! matching breakpoint can hold it until the operator resumes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use uuid::Uuid;

use super::events::{Event, EventRecord, EventType};
use crate::debugger::DebugSession;
use crate::error::{BusError, Error, Result};
use crate::types::{thread_safe_rw, EventCallback, ThreadSafeRw};

/// Subscription handle identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

struct Handler<T: EventType> {
    id: SubscriptionId,
    once: bool,
    callback: EventCallback<T>,
}

type HandlerMap<T> = HashMap<T, Vec<Handler<T>>>;

/// Capability to remove one subscription
///
/// Dropping it leaves the subscription in place.
pub struct Subscription<T: EventType> {
    id: SubscriptionId,
    event_type: T,
    handlers: Weak<RwLock<HandlerMap<T>>>,
}

impl<T: EventType> Subscription<T> {
    /// Subscription identifier
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Event type this subscription listens to
    pub fn event_type(&self) -> T {
        self.event_type
    }

    /// Remove the subscription
    ///
    /// Returns true if it was still registered.
    pub fn unsubscribe(self) -> bool {
        let Some(handlers) = self.handlers.upgrade() else {
            return false;
        };
        let mut handlers = handlers.write();
        let Some(list) = handlers.get_mut(&self.event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| h.id != self.id);
        let removed = list.len() != before;
        if removed {
            tracing::debug!("Subscription {} removed from {}", self.id, self.event_type);
        }
        removed
    }
}

impl<T: EventType> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .finish()
    }
}

/// Typed event bus bound to the family `T`
pub struct EventBus<T: EventType> {
    /// Subscribers keyed by event type, in registration order
    handlers: ThreadSafeRw<HandlerMap<T>>,
    /// Breakpoint gate every dispatch passes through
    session: DebugSession,
}

impl<T: EventType> EventBus<T> {
    /// Create a bus whose dispatches are gated by `session`
    pub fn new(session: &DebugSession) -> Self {
        tracing::debug!("Event bus created for family {}", T::FAMILY);
        Self {
            handlers: thread_safe_rw(HashMap::new()),
            session: session.clone(),
        }
    }

    /// The family this bus accepts
    pub fn family(&self) -> &'static str {
        T::FAMILY
    }

    /// The debug session gating this bus
    pub fn session(&self) -> &DebugSession {
        &self.session
    }

    /// Subscribe to every event of type `kind`
    pub fn on<F>(&self, kind: T, callback: F) -> Subscription<T>
    where
        F: Fn(&Event<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_handler(kind, Arc::new(callback), false)
    }

    /// Subscribe to the next event of type `kind` only
    pub fn once<F>(&self, kind: T, callback: F) -> Subscription<T>
    where
        F: Fn(&Event<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_handler(kind, Arc::new(callback), true)
    }

    pub(crate) fn subscribe_callback(
        &self,
        kind: T,
        callback: EventCallback<T>,
    ) -> Subscription<T> {
        self.add_handler(kind, callback, false)
    }

    fn add_handler(&self, kind: T, callback: EventCallback<T>, once: bool) -> Subscription<T> {
        let id = SubscriptionId::new();
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Handler { id, once, callback });
        tracing::debug!("Subscription {} added for {}::{}", id, T::FAMILY, kind);
        Subscription {
            id,
            event_type: kind,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    /// Drop every subscription on this bus
    pub fn remove_all_listeners(&self) {
        self.handlers.write().clear();
        tracing::debug!("All subscriptions removed from {} bus", T::FAMILY);
    }

    /// Number of subscriptions for one event type
    pub fn listener_count(&self, kind: T) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Number of subscriptions across all event types
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    /// Validate a family-erased record against this bus
    ///
    /// Rejects records of another family and type tags the family does
    /// not allow.
    pub fn check_event(&self, record: &EventRecord) -> std::result::Result<Event<T>, BusError> {
        if !record.family.is_empty() && record.family != T::FAMILY {
            return Err(BusError::WrongFamily {
                expected: T::FAMILY.to_string(),
                actual: record.family.clone(),
            });
        }
        let kind = T::parse(&record.event_type).ok_or_else(|| BusError::EventTypeNotAllowed {
            family: T::FAMILY.to_string(),
            event_type: record.event_type.clone(),
        })?;
        Ok(Event::new(
            record.source_name.clone(),
            record.source_type.clone(),
            kind,
            record.data.clone(),
        ))
    }

    /// Dispatch an event
    ///
    /// The event is traced and checked against the breakpoint list first;
    /// if a breakpoint matches, this future stays pending until
    /// [`DebugSession::run`] is called. Resolves to whether at least one
    /// subscriber existed for the event type.
    pub async fn send(&self, event: Event<T>) -> Result<bool> {
        let record = event.to_record();
        let delivered = self
            .session
            .check_break(record, || self.dispatch(&event))
            .await??;
        Ok(delivered)
    }

    /// Validate and dispatch a family-erased record
    pub async fn send_record(&self, record: EventRecord) -> Result<bool> {
        let event = self.check_event(&record)?;
        self.send(event).await
    }

    fn dispatch(&self, event: &Event<T>) -> Result<bool> {
        let kind = event.kind();
        let (callbacks, fired_once) = {
            let handlers = self.handlers.read();
            match handlers.get(&kind) {
                Some(list) => (
                    list.iter().map(|h| h.callback.clone()).collect::<Vec<_>>(),
                    list.iter()
                        .filter(|h| h.once)
                        .map(|h| h.id)
                        .collect::<Vec<_>>(),
                ),
                None => (Vec::new(), Vec::new()),
            }
        };

        if !fired_once.is_empty() {
            if let Some(list) = self.handlers.write().get_mut(&kind) {
                list.retain(|h| !fired_once.contains(&h.id));
            }
        }

        for callback in &callbacks {
            callback(event).map_err(Error::Callback)?;
        }
        Ok(!callbacks.is_empty())
    }
}

impl<T: EventType> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            session: self.session.clone(),
        }
    }
}

impl<T: EventType> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("family", &T::FAMILY)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
