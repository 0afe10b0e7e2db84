//! Shared fixtures for unit tests.

use crate::event_bus::{Event, EventRecord};
use serde_json::json;

crate::event_family! {
    /// Events used by unit tests across the crate
    pub enum UnitEvent: "unit" {
        Moved => "moved",
        Attacked => "attacked",
        Died => "died",
    }
}

crate::event_family! {
    /// A second family, for cross-family checks
    pub enum WorldEvent: "world" {
        Dawn => "dawn",
        Dusk => "dusk",
    }
}

/// A `unit` event from `orc-1`
pub fn orc(kind: UnitEvent) -> Event<UnitEvent> {
    Event::new("orc-1", "orc", kind, json!(null))
}

/// A family-erased `unit` record
pub fn record(source_name: &str, source_type: &str, event_type: &str) -> EventRecord {
    EventRecord::new("unit", source_name, source_type, event_type, json!(null))
}
