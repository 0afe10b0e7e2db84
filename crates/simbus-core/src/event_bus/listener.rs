//! Filtered event listeners.
//!
//! An [`EventListener`] wraps one callback behind a priority-ordered
//! [`FilterChain`]. The chain is default-deny: an event reaches the
//! callback only when an allow filter accepts it before any deny filter
//! rejects it.

use std::fmt;
use std::sync::Arc;

use super::bus::{EventBus, Subscription};
use super::events::{Event, EventType, EventView};
use super::filter::{EventFilter, Polarity};
use crate::error::FilterError;
use crate::types::EventCallback;

/// Filters ordered by ascending priority
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<EventFilter>,
}

impl FilterChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a filter after every filter of equal or lower priority
    pub fn add_filter(&mut self, filter: EventFilter) {
        let at = self
            .filters
            .iter()
            .position(|f| f.priority() > filter.priority())
            .unwrap_or(self.filters.len());
        self.filters.insert(at, filter);
    }

    /// Filters in evaluation order
    pub fn filters(&self) -> &[EventFilter] {
        &self.filters
    }

    /// Decide whether an event reaches the callback
    ///
    /// The first deny match drops the event, the first allow match accepts
    /// it. With no match the event is dropped.
    pub fn apply_filter(&self, event: &dyn EventView) -> bool {
        for filter in &self.filters {
            if filter.deny_event(event) {
                return false;
            }
            if filter.allow_event(event) {
                return true;
            }
        }
        false
    }

    /// Event types a listener with this chain subscribes to
    ///
    /// The union of types named by allow filters, or every type of the
    /// family when no allow filter names one.
    pub fn attached_events<T: EventType>(&self) -> Result<Vec<T>, FilterError> {
        let mut named: Vec<T> = Vec::new();
        for filter in self
            .filters
            .iter()
            .filter(|f| f.polarity() == Polarity::Allow)
        {
            let Some(tag) = filter.event_type() else {
                continue;
            };
            let kind = T::parse(tag).ok_or_else(|| FilterError::UnknownEventType {
                family: T::FAMILY.to_string(),
                event_type: tag.to_string(),
            })?;
            if !named.contains(&kind) {
                named.push(kind);
            }
        }

        if named.is_empty() {
            Ok(T::all().to_vec())
        } else {
            Ok(named)
        }
    }
}

/// A callback subscribed to a bus through a filter chain
pub struct EventListener<T: EventType> {
    chain: Arc<FilterChain>,
    attached: Vec<T>,
    subscriptions: Vec<Subscription<T>>,
}

impl<T: EventType> EventListener<T> {
    /// Build the chain and subscribe one wrapper per attached event type
    ///
    /// Fails if an allow filter names an event type outside the bus family.
    pub fn new<I, F>(bus: &EventBus<T>, filters: I, callback: F) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = EventFilter>,
        F: Fn(&Event<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut chain = FilterChain::new();
        for filter in filters {
            chain.add_filter(filter);
        }
        let attached = chain.attached_events::<T>()?;
        let chain = Arc::new(chain);

        let wrapper: EventCallback<T> = {
            let chain = chain.clone();
            Arc::new(move |event: &Event<T>| {
                if chain.apply_filter(event) {
                    callback(event)
                } else {
                    Ok(())
                }
            })
        };

        let subscriptions = attached
            .iter()
            .map(|kind| bus.subscribe_callback(*kind, wrapper.clone()))
            .collect();

        tracing::debug!(
            "Listener attached to {} event types on {} bus",
            attached.len(),
            T::FAMILY
        );

        Ok(Self {
            chain,
            attached,
            subscriptions,
        })
    }

    /// Event types this listener is subscribed to
    pub fn attached_events(&self) -> &[T] {
        &self.attached
    }

    /// Filters in evaluation order
    pub fn filters(&self) -> &[EventFilter] {
        self.chain.filters()
    }

    /// Unsubscribe from the bus, returning how many subscriptions were removed
    pub fn detach(self) -> usize {
        self.subscriptions
            .into_iter()
            .map(Subscription::unsubscribe)
            .filter(|removed| *removed)
            .count()
    }
}

impl<T: EventType> fmt::Debug for EventListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("attached", &self.attached)
            .field("filters", &self.chain.filters().len())
            .finish()
    }
}
