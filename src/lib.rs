//! # Simbus
//!
//! Event plumbing for step-driven simulations:
//! - Typed event families and filtered publish/subscribe buses
//! - A breakpoint debugger that can suspend a dispatch until resumed
//! - A tick clock whose watchdog reports a stalled host loop
//!
//! ## Architecture
//!
//! Simbus is organized as a workspace with multiple crates:
//!
//! 1. **simbus-core** - Event bus, filters, listeners, debugger, tick clock
//! 2. **simbus-settings** - Configuration files and preset breakpoints
//! 3. **simbus** - Facade that re-exports both and sets up logging

pub use simbus_core::{debugger, error, event_bus, event_family, sync, types};

pub use simbus_core::{
    Breakpoint, BreakpointCriteria, BreakpointRef, BusError, Combinator, DebugError,
    DebugSession, Error, Event, EventBus, EventFilter, EventListener, EventRecord, EventType,
    EventView, FilterChain, FilterCriteria, FilterError, PauseReason, Polarity, Result,
    StallReport, Subscription, SubscriptionId, SyncError, Synchronize, SynchronizeConfig,
    TickListener, TickListenerId, Trace,
};

pub use simbus_settings as settings;
pub use simbus_settings::{BreakpointPreset, Config, DebuggerSettings, SettingsError};

/// Initialize structured logging
///
/// Honors `RUST_LOG`, with `info` as the baseline level. Fails if a global
/// subscriber is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!("Logging initialized");
    Ok(())
}

/// Build a session and clock from `config`
///
/// Registers the preset breakpoints, attaches the clock to the session and
/// starts it. Must be called inside a tokio runtime.
pub fn bootstrap(config: &Config) -> anyhow::Result<(DebugSession, Synchronize)> {
    let clock = Synchronize::new();
    let session = DebugSession::with_clock(&clock);
    let presets = config.apply_breakpoints(&session)?;
    clock.init(config.synchronize)?;
    tracing::info!(
        "Simbus started with {} preset breakpoints",
        presets.len()
    );
    Ok((session, clock))
}
