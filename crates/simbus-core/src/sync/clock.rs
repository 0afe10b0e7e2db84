//! Tick clock with a stall watchdog.
//!
//! In synchronous mode the host loop calls [`Synchronize::next_tick`] once
//! per step and a watchdog fires every `watchdog_timeout_ms`: if no tick was
//! seen since the previous firing the host is considered stalled. In
//! asynchronous mode an internal timer advances ticks instead and there is
//! no watchdog.
//!
//! Stalls are fatal and reported out-of-band: the watchdog logs at `error`,
//! publishes a [`StallReport`] on [`Synchronize::stalls`], calls the handler
//! installed with [`Synchronize::on_stall`] and stops.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::config::SynchronizeConfig;
use super::listener::{TickListener, TickListenerId};
use crate::error::{Error, Result, SyncError};
use crate::types::{thread_safe, StallHandler, ThreadSafe};

/// Details of a watchdog stall
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallReport {
    /// Watchdog window in milliseconds.
    pub timeout_ms: u64,
    /// Tick count when the stall was detected.
    pub tick_count: u64,
}

impl StallReport {
    /// The fatal error this report stands for
    pub fn to_error(&self) -> SyncError {
        SyncError::Stalled {
            timeout_ms: self.timeout_ms,
            tick_count: self.tick_count,
        }
    }
}

impl fmt::Display for StallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

#[derive(Default)]
struct ClockState {
    config: Option<SynchronizeConfig>,
    tick_count: u64,
    had_tick: bool,
    watchdog: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    listeners: Vec<(TickListenerId, Arc<dyn TickListener>)>,
    stall_handler: Option<StallHandler>,
}

impl ClockState {
    fn begin_tick(&mut self) -> (u64, Vec<Arc<dyn TickListener>>) {
        self.tick_count += 1;
        self.had_tick = true;
        let listeners = self.listeners.iter().map(|(_, l)| l.clone()).collect();
        (self.tick_count, listeners)
    }
}

async fn notify(tick: u64, listeners: &[Arc<dyn TickListener>]) -> Result<()> {
    for listener in listeners {
        listener.on_tick(tick).await.map_err(Error::Callback)?;
    }
    Ok(())
}

/// Tick clock handle
///
/// Clones share the same clock. Timer tasks only hold weak references, so
/// they stop once every handle is dropped.
#[derive(Clone)]
pub struct Synchronize {
    state: ThreadSafe<ClockState>,
    stalls: Arc<watch::Sender<Option<StallReport>>>,
}

impl Synchronize {
    /// Create an uninitialized clock
    pub fn new() -> Self {
        let (stalls, _) = watch::channel(None);
        Self {
            state: thread_safe(ClockState::default()),
            stalls: Arc::new(stalls),
        }
    }

    /// Start the clock
    ///
    /// Must be called from inside a tokio runtime: synchronous mode starts
    /// the watchdog, asynchronous mode starts the internal ticker.
    pub fn init(&self, config: SynchronizeConfig) -> std::result::Result<(), SyncError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;

        let mut state = self.state.lock();
        if state.config.is_some() {
            return Err(SyncError::AlreadyInitialized);
        }
        state.config = Some(config);
        state.tick_count = 0;
        state.had_tick = false;
        self.stalls.send_if_modified(|stall| stall.take().is_some());

        if config.synchronous {
            state.watchdog = Some(self.spawn_watchdog(&runtime, config.watchdog_timeout()));
            tracing::info!(
                "Synchronize initialized (synchronous, watchdog {}ms)",
                config.watchdog_timeout_ms
            );
        } else {
            state.ticker = Some(self.spawn_ticker(&runtime, config.async_tick_interval()));
            tracing::info!(
                "Synchronize initialized (asynchronous, tick every {}ms)",
                config.async_tick_interval_ms
            );
        }
        Ok(())
    }

    /// Stop all timers and forget listeners and the tick count
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if let Some(handle) = state.watchdog.take() {
            handle.abort();
        }
        if let Some(handle) = state.ticker.take() {
            handle.abort();
        }
        let was_initialized = state.config.take().is_some();
        state.tick_count = 0;
        state.had_tick = false;
        state.listeners.clear();
        if was_initialized {
            tracing::info!("Synchronize shut down");
        }
    }

    /// True between `init()` and `shutdown()`
    pub fn is_initialized(&self) -> bool {
        self.state.lock().config.is_some()
    }

    /// Whether the host drives ticks
    pub fn is_synchronous(&self) -> std::result::Result<bool, SyncError> {
        self.state
            .lock()
            .config
            .map(|config| config.synchronous)
            .ok_or(SyncError::NotInitialized)
    }

    /// Number of ticks since `init()`
    pub fn tick_count(&self) -> std::result::Result<u64, SyncError> {
        let state = self.state.lock();
        state
            .config
            .map(|_| state.tick_count)
            .ok_or(SyncError::NotInitialized)
    }

    /// Advance one tick and run every listener in registration order
    ///
    /// Only available in synchronous mode. Resolves with the new tick count
    /// once the last listener has finished; a failing listener stops the
    /// sequence and fails the tick.
    pub async fn next_tick(&self) -> Result<u64> {
        let (tick, listeners) = {
            let mut state = self.state.lock();
            let config = state.config.ok_or(SyncError::NotInitialized)?;
            if !config.synchronous {
                return Err(SyncError::AsynchronousMode.into());
            }
            state.begin_tick()
        };

        tracing::trace!("Tick {}", tick);
        notify(tick, &listeners).await?;
        Ok(tick)
    }

    /// Add a tick listener
    pub fn register(
        &self,
        listener: Arc<dyn TickListener>,
    ) -> std::result::Result<TickListenerId, SyncError> {
        let mut state = self.state.lock();
        if state.config.is_none() {
            return Err(SyncError::NotInitialized);
        }
        let id = TickListenerId::new();
        state.listeners.push((id, listener));
        tracing::debug!("Tick listener {} registered", id);
        Ok(id)
    }

    /// Remove a tick listener, returning whether it was registered
    pub fn unregister(&self, id: TickListenerId) -> std::result::Result<bool, SyncError> {
        let mut state = self.state.lock();
        if state.config.is_none() {
            return Err(SyncError::NotInitialized);
        }
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = state.listeners.len() != before;
        if removed {
            tracing::debug!("Tick listener {} unregistered", id);
        }
        Ok(removed)
    }

    /// Stop the watchdog without touching the tick count or configuration
    pub fn pause_watchdog(&self) {
        if let Some(handle) = self.state.lock().watchdog.take() {
            handle.abort();
            tracing::debug!("Watchdog paused");
        }
    }

    /// Restart a paused watchdog
    ///
    /// Does nothing in asynchronous mode, before `init()`, or when the
    /// watchdog is already running.
    pub fn start_watchdog(&self) {
        let mut state = self.state.lock();
        let Some(config) = state.config else {
            return;
        };
        if !config.synchronous || state.watchdog.is_some() {
            return;
        }
        match Handle::try_current() {
            Ok(runtime) => {
                state.watchdog = Some(self.spawn_watchdog(&runtime, config.watchdog_timeout()));
                tracing::debug!("Watchdog restarted");
            }
            Err(_) => tracing::warn!("Cannot restart watchdog outside a tokio runtime"),
        }
    }

    /// True while the watchdog timer is armed
    pub fn is_watchdog_running(&self) -> bool {
        self.state.lock().watchdog.is_some()
    }

    /// Install the out-of-band stall handler
    ///
    /// Runs on the watchdog task. Hosts typically terminate from here.
    pub fn on_stall<F>(&self, handler: F)
    where
        F: Fn(&StallReport) + Send + Sync + 'static,
    {
        self.state.lock().stall_handler = Some(Arc::new(handler));
    }

    /// Observe stalls; the value is `Some` once the watchdog has fired
    pub fn stalls(&self) -> watch::Receiver<Option<StallReport>> {
        self.stalls.subscribe()
    }

    fn spawn_watchdog(&self, runtime: &Handle, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Mutex<ClockState>> = Arc::downgrade(&self.state);
        let stalls = self.stalls.clone();
        let timeout_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);

        runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(state) = weak.upgrade() else {
                    break;
                };
                let (report, handler) = {
                    let mut state = state.lock();
                    if state.had_tick {
                        state.had_tick = false;
                        continue;
                    }
                    state.watchdog = None;
                    (
                        StallReport {
                            timeout_ms,
                            tick_count: state.tick_count,
                        },
                        state.stall_handler.clone(),
                    )
                };

                tracing::error!("{}", report);
                stalls.send_replace(Some(report.clone()));
                if let Some(handler) = handler {
                    handler(&report);
                }
                break;
            }
        })
    }

    fn spawn_ticker(&self, runtime: &Handle, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Mutex<ClockState>> = Arc::downgrade(&self.state);

        runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(state) = weak.upgrade() else {
                    break;
                };
                let (tick, listeners) = state.lock().begin_tick();
                drop(state);

                if let Err(err) = notify(tick, &listeners).await {
                    tracing::warn!("Tick {} listener failed: {}", tick, err);
                }
            }
        })
    }
}

impl Default for Synchronize {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Synchronize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Synchronize")
            .field("config", &state.config)
            .field("tick_count", &state.tick_count)
            .field("listeners", &state.listeners.len())
            .field("watchdog", &state.watchdog.is_some())
            .finish()
    }
}
