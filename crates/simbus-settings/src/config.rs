//! Configuration management for simbus
//!
//! Reads and writes the runtime configuration as JSON or TOML, picked by
//! file extension. Configuration is organized into two sections:
//! - `synchronize`: tick clock mode and timer periods
//! - `debugger`: breakpoints registered at startup
//!
//! ```toml
//! [synchronize]
//! synchronous = true
//! watchdogTimeoutMs = 5000
//!
//! [[debugger.breakpoints]]
//! name = "deaths"
//! criteria = { eventType = "died", any = true, count = 3 }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use simbus_core::{Breakpoint, BreakpointCriteria, DebugSession, FilterError, SynchronizeConfig};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// File name used under the platform config directory
pub const CONFIG_FILE_NAME: &str = "simbus.toml";

/// A breakpoint to register when a session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointPreset {
    /// Label; generic `bp<N>` naming applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Breakpoint criteria object, including the count/once/every/disabled keys.
    pub criteria: Value,
}

impl BreakpointPreset {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    fn compile(&self) -> Result<BreakpointCriteria, FilterError> {
        let criteria = BreakpointCriteria::from_json(&self.criteria)?;
        // dry run so bad presets fail at load rather than at session start
        Breakpoint::new(self.label(), criteria.clone())?;
        Ok(criteria)
    }
}

/// Debugger preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerSettings {
    /// Breakpoints registered in order at startup
    pub breakpoints: Vec<BreakpointPreset>,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> ConfigResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tick clock settings
    pub synchronize: SynchronizeConfig,
    /// Debugger settings
    pub debugger: DebuggerSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::info!(
            "Loaded config from {} ({} preset breakpoints)",
            path.display(),
            config.debugger.breakpoints.len()
        );
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        self.synchronize
            .validate()
            .map_err(|e| SettingsError::InvalidSetting {
                key: "synchronize".to_string(),
                reason: e.to_string(),
            })?;

        for preset in &self.debugger.breakpoints {
            preset.compile().map_err(|source| SettingsError::Breakpoint {
                name: preset.label().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Register every preset breakpoint on `session`, in file order
    pub fn apply_breakpoints(&self, session: &DebugSession) -> SettingsResult<Vec<Breakpoint>> {
        self.debugger
            .breakpoints
            .iter()
            .map(|preset| {
                let criteria = preset.compile().map_err(|source| SettingsError::Breakpoint {
                    name: preset.label().to_string(),
                    source,
                })?;
                session
                    .add_breakpoint(criteria, preset.name.as_deref())
                    .map_err(|source| SettingsError::Breakpoint {
                        name: preset.label().to_string(),
                        source,
                    })
            })
            .collect()
    }

    /// Platform config file location, e.g. `~/.config/simbus/simbus.toml`
    pub fn default_config_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("simbus").join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no platform config directory".to_string())
            })
    }
}
