//! Tick listener interface

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

/// Handle for a registered tick listener.
///
/// Returned by `Synchronize::register` and accepted by `unregister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickListenerId(Uuid);

impl TickListenerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TickListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({})", &self.0.to_string()[..8])
    }
}

/// Listener trait for clock ticks
///
/// Listeners run one after another in registration order; a tick is not
/// complete until every listener's future has settled.
#[async_trait]
pub trait TickListener: Send + Sync {
    /// Called once per tick with the new tick count
    async fn on_tick(&self, tick: u64) -> anyhow::Result<()>;
}
