//! Error handling for simbus
//!
//! Provides error types for every layer of the event system:
//! - Filter errors (malformed criteria, raised at construction)
//! - Bus errors (events outside a bus family)
//! - Debug errors (pause/resume misuse)
//! - Sync errors (tick clock lifecycle and watchdog stalls)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Filter criteria error type
///
/// Raised while compiling filter or breakpoint criteria. These are
/// configuration errors: they never surface at match time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Criteria named a key the compiler does not understand
    #[error("Unknown filter criteria key: {key}")]
    UnknownKey {
        /// The offending key.
        key: String,
    },

    /// Criteria contained no atomic test
    #[error("Filter criteria must name at least one of sourceType, sourceName, eventType or fn")]
    NoCriteria,

    /// Criteria did not pick a combinator
    #[error("Filter criteria must set exactly one of any, all or none")]
    MissingCombinator,

    /// Criteria picked more than one combinator
    #[error("Filter criteria set more than one combinator: {combinators}")]
    MultipleCombinators {
        /// The combinators that were set, comma separated.
        combinators: String,
    },

    /// Breakpoint count threshold of zero
    #[error("Breakpoint count must be at least 1")]
    InvalidCount,

    /// An event type tag that is not part of the family
    #[error("Event type '{event_type}' is not part of the {family} family")]
    UnknownEventType {
        /// The family that was searched.
        family: String,
        /// The unrecognised tag.
        event_type: String,
    },

    /// Criteria could not be decoded
    #[error("Malformed filter criteria: {reason}")]
    Malformed {
        /// Why decoding failed.
        reason: String,
    },
}

/// Event bus error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Event belongs to another family
    #[error("Event of family '{actual}' sent to a '{expected}' bus")]
    WrongFamily {
        /// The family the bus is bound to.
        expected: String,
        /// The family the event claims.
        actual: String,
    },

    /// Event type tag is not allowed by the bus family
    #[error("Event type '{event_type}' is not allowed on a '{family}' bus")]
    EventTypeNotAllowed {
        /// The family the bus is bound to.
        family: String,
        /// The rejected tag.
        event_type: String,
    },
}

/// Debugger error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugError {
    /// `run()` was called while nothing was paused
    #[error("Program is not paused")]
    NotPaused,

    /// A second pause was requested while one is still pending
    #[error("Program is already paused at {at}")]
    AlreadyPaused {
        /// Description of the pending pause.
        at: String,
    },

    /// The session dropped a pending pause without resuming it
    #[error("Paused dispatch was abandoned before resume")]
    PauseAbandoned,
}

/// Tick clock error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Clock used before `init()`
    #[error("Synchronize is not initialized")]
    NotInitialized,

    /// `init()` called twice without `shutdown()`
    #[error("Synchronize is already initialized")]
    AlreadyInitialized,

    /// `next_tick()` in asynchronous mode
    #[error("next_tick is only available in synchronous mode")]
    AsynchronousMode,

    /// Timers need a tokio runtime
    #[error("Synchronize requires a running tokio runtime")]
    NoRuntime,

    /// Invalid clock configuration
    #[error("Invalid synchronize configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// Watchdog saw no tick inside its window
    #[error("Watchdog timeout: no tick within {timeout_ms}ms (last tick {tick_count})")]
    Stalled {
        /// Watchdog window in milliseconds.
        timeout_ms: u64,
        /// Tick count when the stall was detected.
        tick_count: u64,
    },
}

/// Main error type for simbus
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Filter error
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Bus error
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Debug error
    #[error(transparent)]
    Debug(#[from] DebugError),

    /// Sync error
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A listener callback failed during dispatch
    #[error("Listener callback failed: {0}")]
    Callback(#[source] anyhow::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a configuration error raised at construction
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Filter(_) | Error::Sync(SyncError::InvalidConfig { .. })
        )
    }

    /// Check if this is a caller-recoverable usage error
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::Bus(_)
                | Error::Debug(_)
                | Error::Sync(
                    SyncError::NotInitialized
                        | SyncError::AlreadyInitialized
                        | SyncError::AsynchronousMode
                        | SyncError::NoRuntime
                )
        )
    }

    /// Check if this is a fatal watchdog error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Sync(SyncError::Stalled { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
