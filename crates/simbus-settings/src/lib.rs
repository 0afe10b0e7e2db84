//! Simbus Settings Crate
//!
//! Loads the clock and debugger configuration from JSON or TOML files and
//! registers preset breakpoints on a debug session.

pub mod config;
pub mod error;

pub use config::{BreakpointPreset, Config, DebuggerSettings, CONFIG_FILE_NAME};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
