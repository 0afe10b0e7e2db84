//! Type aliases for commonly used complex types.
//!
//! Handles in this crate (`EventBus`, `DebugSession`, `Synchronize`) are
//! cheap clones around shared state. The aliases below name that state
//! and the callback shapes stored in it.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::event_bus::Event;

/// A thread-safe, mutex-protected wrapper.
///
/// Uses `parking_lot::Mutex`. Guards must never be held across an `.await`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe reader-writer lock wrapper for read-heavy state such as
/// subscription registries.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// A subscriber callback for events of family `T`.
///
/// Returning an error aborts the fan-out and fails the dispatch.
pub type EventCallback<T> = Arc<dyn Fn(&Event<T>) -> anyhow::Result<()> + Send + Sync>;

/// Out-of-band handler invoked when the watchdog detects a stall.
pub type StallHandler = Arc<dyn Fn(&crate::sync::StallReport) + Send + Sync>;

/// Create a new [`ThreadSafe`] value.
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new [`ThreadSafeRw`] value.
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}
