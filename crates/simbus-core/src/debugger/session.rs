//! Debug session: breakpoint registry and dispatch gate.
//!
//! A [`DebugSession`] owns the ordered breakpoint list, the trace and the
//! single pending pause. Buses receive the session at construction and send
//! every dispatch through [`DebugSession::check_break`].
//!
//! ## Pause protocol
//!
//! ```text
//!   running ──(breakpoint match / armed step)──► paused
//!      ▲                                           │
//!      └─────────────────── run() ◄────────────────┘
//! ```
//!
//! At most one pause may be outstanding. While paused the attached
//! [`Synchronize`] watchdog is stopped so the suspension is not reported as
//! a stall; `run()` restarts it.

use serde_json::Value;
use std::fmt;
use tokio::sync::oneshot;

use super::breakpoint::{Breakpoint, BreakpointCriteria};
use super::trace::Trace;
use crate::error::{DebugError, FilterError};
use crate::event_bus::EventRecord;
use crate::sync::Synchronize;
use crate::types::{thread_safe, ThreadSafe};

/// Address of one or more breakpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointRef {
    /// 1-based display index.
    Index(usize),
    /// Display name; several breakpoints may share one.
    Name(String),
}

impl From<usize> for BreakpointRef {
    fn from(index: usize) -> Self {
        BreakpointRef::Index(index)
    }
}

impl From<&str> for BreakpointRef {
    /// Numeric strings address by index, anything else by name
    fn from(value: &str) -> Self {
        match value.parse::<usize>() {
            Ok(index) => BreakpointRef::Index(index),
            Err(_) => BreakpointRef::Name(value.to_string()),
        }
    }
}

impl From<String> for BreakpointRef {
    fn from(value: String) -> Self {
        BreakpointRef::from(value.as_str())
    }
}

impl fmt::Display for BreakpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakpointRef::Index(index) => write!(f, "#{}", index),
            BreakpointRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Why the program is paused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseReason {
    /// A registered breakpoint matched.
    Breakpoint(String),
    /// A one-shot step armed by [`DebugSession::set_breakpoint`].
    Step,
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PauseReason::Breakpoint(name) => write!(f, "breakpoint {}", name),
            PauseReason::Step => write!(f, "step"),
        }
    }
}

struct PendingPause {
    id: u64,
    reason: PauseReason,
    event: EventRecord,
    resume: oneshot::Sender<()>,
}

#[derive(Default)]
struct SessionState {
    breakpoints: Vec<Breakpoint>,
    generic_count: u32,
    trace: Trace,
    step_armed: bool,
    pending: Option<PendingPause>,
    pause_seq: u64,
    clock: Option<Synchronize>,
}

impl SessionState {
    fn find_indices(&self, target: &BreakpointRef) -> Vec<usize> {
        match target {
            BreakpointRef::Index(index) => match index.checked_sub(1) {
                Some(i) if i < self.breakpoints.len() => vec![i],
                _ => Vec::new(),
            },
            BreakpointRef::Name(name) => self
                .breakpoints
                .iter()
                .enumerate()
                .filter(|(_, bp)| bp.name() == name)
                .map(|(i, _)| i)
                .collect(),
        }
    }

    /// First enabled breakpoint matching `event`, in registration order.
    /// A `once` breakpoint is disabled here, before any pause is entered.
    fn match_breakpoints(&mut self, event: &EventRecord) -> Option<String> {
        for bp in self.breakpoints.iter_mut() {
            if bp.match_event(event) {
                if bp.is_once() {
                    bp.disable();
                }
                return Some(bp.name().to_string());
            }
        }
        None
    }
}

/// Releases the pending pause if its dispatch future is dropped before
/// [`DebugSession::run`], so the session does not stay paused with the
/// watchdog stopped.
struct PauseGuard {
    session: DebugSession,
    id: u64,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        let clock = {
            let mut state = self.session.state.lock();
            if !state.pending.as_ref().is_some_and(|p| p.id == self.id) {
                return;
            }
            if let Some(pending) = state.pending.take() {
                tracing::warn!(
                    "Paused dispatch at {} was dropped before resume",
                    pending.reason
                );
            }
            state.clock.clone()
        };
        if let Some(clock) = clock {
            clock.start_watchdog();
        }
    }
}

/// Breakpoint registry, trace and pause state shared by every bus
#[derive(Clone)]
pub struct DebugSession {
    state: ThreadSafe<SessionState>,
}

impl DebugSession {
    /// Create a session with no clock attached
    pub fn new() -> Self {
        Self {
            state: thread_safe(SessionState::default()),
        }
    }

    /// Create a session that pauses `clock`'s watchdog while suspended
    pub fn with_clock(clock: &Synchronize) -> Self {
        let session = Self::new();
        session.attach_clock(clock);
        session
    }

    /// Attach the tick clock whose watchdog is paused while suspended
    pub fn attach_clock(&self, clock: &Synchronize) {
        self.state.lock().clock = Some(clock.clone());
    }

    /// Register a breakpoint at the end of the list
    ///
    /// Without a name the breakpoint is called `bp<N>`, where N counts
    /// generically named breakpoints since the last [`clear_all`](Self::clear_all).
    pub fn add_breakpoint(
        &self,
        criteria: BreakpointCriteria,
        name: Option<&str>,
    ) -> Result<Breakpoint, FilterError> {
        let mut state = self.state.lock();
        let generic = name.is_none();
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("bp{}", state.generic_count + 1),
        };

        let bp = Breakpoint::new(name, criteria)?;
        if generic {
            state.generic_count += 1;
        }
        tracing::info!("Breakpoint {} set: {}", state.breakpoints.len() + 1, bp);
        state.breakpoints.push(bp.clone());
        Ok(bp)
    }

    /// Register a breakpoint from its JSON criteria
    pub fn add_breakpoint_json(
        &self,
        criteria: &Value,
        name: Option<&str>,
    ) -> Result<Breakpoint, FilterError> {
        self.add_breakpoint(BreakpointCriteria::from_json(criteria)?, name)
    }

    /// Snapshot of the breakpoint list in registration order
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.state.lock().breakpoints.clone()
    }

    /// Rendered breakpoint list
    pub fn list(&self) -> Vec<String> {
        self.state
            .lock()
            .breakpoints
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Resolve an index or name to breakpoints
    pub fn find(&self, target: impl Into<BreakpointRef>) -> Vec<Breakpoint> {
        let target = target.into();
        let state = self.state.lock();
        state
            .find_indices(&target)
            .into_iter()
            .map(|i| state.breakpoints[i].clone())
            .collect()
    }

    /// Remove matching breakpoints, reporting whether any were found
    pub fn clear(&self, target: impl Into<BreakpointRef>) -> bool {
        let target = target.into();
        let mut state = self.state.lock();
        let indices = state.find_indices(&target);
        for i in indices.iter().rev() {
            state.breakpoints.remove(*i);
        }
        report(&target, "cleared", indices.len())
    }

    /// Disable matching breakpoints, reporting whether any were found
    pub fn disable(&self, target: impl Into<BreakpointRef>) -> bool {
        self.apply(target.into(), "disabled", Breakpoint::disable)
    }

    /// Enable matching breakpoints, reporting whether any were found
    pub fn enable(&self, target: impl Into<BreakpointRef>) -> bool {
        self.apply(target.into(), "enabled", Breakpoint::enable)
    }

    fn apply(&self, target: BreakpointRef, action: &str, f: fn(&mut Breakpoint)) -> bool {
        let mut state = self.state.lock();
        let indices = state.find_indices(&target);
        for i in &indices {
            f(&mut state.breakpoints[*i]);
        }
        report(&target, action, indices.len())
    }

    /// Remove every breakpoint and restart generic naming at `bp1`
    pub fn clear_all(&self) {
        let mut state = self.state.lock();
        state.breakpoints.clear();
        state.generic_count = 0;
        tracing::info!("All breakpoints cleared");
    }

    /// Arm a one-shot pause on the next dispatch, ignoring the breakpoint list
    pub fn set_breakpoint(&self) {
        self.state.lock().step_armed = true;
        tracing::debug!("Step armed");
    }

    /// True while a dispatch is suspended
    pub fn is_paused(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// The event the program is paused on
    pub fn paused_event(&self) -> Option<EventRecord> {
        self.state.lock().pending.as_ref().map(|p| p.event.clone())
    }

    /// Why the program is paused
    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.state.lock().pending.as_ref().map(|p| p.reason.clone())
    }

    /// Snapshot of every event that reached the gate
    pub fn trace_history(&self) -> Vec<EventRecord> {
        self.state.lock().trace.event_history()
    }

    /// Forget the trace
    pub fn clear_trace(&self) {
        self.state.lock().trace.clear_event_history();
    }

    /// Gate one dispatch
    ///
    /// Records `event` in the trace and scans the breakpoint list. On a match
    /// (or an armed step) the returned future stays pending until
    /// [`run`](Self::run); otherwise `continuation` runs immediately. Either
    /// way the result is `continuation`'s.
    pub async fn check_break<R, F>(&self, event: EventRecord, continuation: F) -> Result<R, DebugError>
    where
        F: FnOnce() -> R,
    {
        let paused = {
            let mut state = self.state.lock();
            state.trace.add_event(event.clone());

            let hit = state.match_breakpoints(&event);
            let step = std::mem::take(&mut state.step_armed);
            let reason = match hit {
                Some(name) => Some(PauseReason::Breakpoint(name)),
                None if step => Some(PauseReason::Step),
                None => None,
            };

            match reason {
                None => None,
                Some(reason) => {
                    if let Some(pending) = &state.pending {
                        if !pending.resume.is_closed() {
                            return Err(DebugError::AlreadyPaused {
                                at: format!("{} ({})", pending.reason, pending.event),
                            });
                        }
                        tracing::warn!(
                            "Discarding pause at {}: its dispatch was dropped",
                            pending.reason
                        );
                    }
                    let (resume, resumed) = oneshot::channel();
                    tracing::info!("Paused at {} on {}", reason, event);
                    state.pause_seq += 1;
                    let id = state.pause_seq;
                    state.pending = Some(PendingPause {
                        id,
                        reason,
                        event,
                        resume,
                    });
                    // watchdog stops before the session lock is released
                    if let Some(clock) = &state.clock {
                        clock.pause_watchdog();
                    }
                    Some((resumed, id))
                }
            }
        };

        if let Some((resumed, id)) = paused {
            let _guard = PauseGuard {
                session: self.clone(),
                id,
            };
            resumed.await.map_err(|_| DebugError::PauseAbandoned)?;
        }

        Ok(continuation())
    }

    /// Resume the pending pause and restart the watchdog
    pub fn run(&self) -> Result<(), DebugError> {
        let (pending, clock) = {
            let mut state = self.state.lock();
            let pending = state.pending.take().ok_or(DebugError::NotPaused)?;
            (pending, state.clock.clone())
        };

        tracing::info!("Resuming from {}", pending.reason);
        if pending.resume.send(()).is_err() {
            tracing::warn!("Paused dispatch was dropped before resume");
        }
        if let Some(clock) = clock {
            clock.start_watchdog();
        }
        Ok(())
    }
}

fn report(target: &BreakpointRef, action: &str, found: usize) -> bool {
    if found == 0 {
        tracing::warn!("No breakpoint matches {}", target);
        false
    } else {
        tracing::info!("{} breakpoint(s) {} for {}", found, action, target);
        true
    }
}

impl Default for DebugSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DebugSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DebugSession")
            .field("breakpoints", &state.breakpoints.len())
            .field("trace", &state.trace.len())
            .field("paused", &state.pending.is_some())
            .finish()
    }
}
