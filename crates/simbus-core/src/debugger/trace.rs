//! Dispatch history.
//!
//! Every event that reaches the breakpoint gate is appended here, whether or
//! not it pauses. The log has no filtering logic of its own.

use crate::event_bus::EventRecord;

/// Append-only log of dispatched events
#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Vec<EventRecord>,
}

impl Trace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatched event
    pub fn add_event(&mut self, event: EventRecord) {
        self.events.push(event);
    }

    /// Snapshot of the history, oldest first
    pub fn event_history(&self) -> Vec<EventRecord> {
        self.events.clone()
    }

    /// Forget every recorded event
    pub fn clear_event_history(&mut self) {
        self.events.clear();
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
