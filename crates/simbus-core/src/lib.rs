//! # Simbus Core
//!
//! Typed event bus for simulation loops.
//! Provides filtered publish/subscribe channels, a breakpoint debugger that
//! can suspend dispatch, and a tick clock with a stall watchdog.

pub mod debugger;
pub mod error;
pub mod event_bus;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testing;

pub use debugger::{
    Breakpoint, BreakpointCriteria, BreakpointRef, DebugSession, PauseReason, Trace,
};

pub use error::{BusError, DebugError, Error, FilterError, Result, SyncError};

// Re-export event bus for convenience
pub use event_bus::{
    Combinator, Event, EventBus, EventFilter, EventListener, EventRecord, EventType, EventView,
    FilterChain, FilterCriteria, Polarity, Subscription, SubscriptionId,
};

pub use sync::{StallReport, Synchronize, SynchronizeConfig, TickListener, TickListenerId};

// Re-export type aliases for convenience
pub use types::{
    thread_safe, thread_safe_rw, EventCallback, StallHandler, ThreadSafe, ThreadSafeRw,
};
