//! Controller manager TOML configuration.
//!
//! ```toml
//! update_rate_hz = 100
//! switch_timeout_ms = 5000
//!
//! [shared]
//! service_name = "controller_manager"
//! log_level = "info"
//!
//! [hardware]
//! command_interfaces = ["joint1/position", "joint2/velocity"]
//! state_interfaces = ["joint1/position", "joint1/velocity"]
//!
//! [[controllers]]
//! name = "joint_state_broadcaster"
//! type = "state_broadcaster"
//! state_interfaces = ["*"]
//! autostart = true
//!
//! [[controllers]]
//! name = "position_controller"
//! type = "forward_command_controller"
//! command_interfaces = ["joint1/position"]
//! update_rate = 2
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use evo_common::config::{ConfigError, ConfigLoader, SharedConfig};
use evo_common::consts::{DEFAULT_UPDATE_RATE_DIVISOR, DEFAULT_UPDATE_RATE_HZ, MAX_UPDATE_RATE_HZ};
use evo_common::controller::InterfaceConfiguration;
use evo_common::hardware::StaticHardware;
use serde::Deserialize;

use crate::controller::ControllerParams;

const DEFAULT_SWITCH_TIMEOUT_MS: u64 = 5000;

fn default_update_rate_hz() -> u32 {
    DEFAULT_UPDATE_RATE_HZ
}

fn default_switch_timeout_ms() -> u64 {
    DEFAULT_SWITCH_TIMEOUT_MS
}

fn default_divisor() -> u32 {
    DEFAULT_UPDATE_RATE_DIVISOR
}

/// Top-level manager configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    /// Common service fields.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Loop frequency [Hz].
    #[serde(default = "default_update_rate_hz")]
    pub update_rate_hz: u32,

    /// Caller-side timeout for switches issued at startup [ms]; 0 waits forever.
    #[serde(default = "default_switch_timeout_ms")]
    pub switch_timeout_ms: u64,

    /// Interfaces exported by the static hardware layer.
    #[serde(default)]
    pub hardware: HardwareConfig,

    /// Controllers loaded at startup, in load order.
    #[serde(default)]
    pub controllers: Vec<ControllerEntry>,
}

/// `[hardware]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HardwareConfig {
    /// Read-write interfaces.
    #[serde(default)]
    pub command_interfaces: Vec<String>,
    /// Read-only interfaces.
    #[serde(default)]
    pub state_interfaces: Vec<String>,
}

/// One `[[controllers]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerEntry {
    /// Unique controller name.
    pub name: String,
    /// Loader type identifier.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Absent → none, `["*"]` → all.
    #[serde(default)]
    pub command_interfaces: Option<Vec<String>>,
    /// Absent → none, `["*"]` → all.
    #[serde(default)]
    pub state_interfaces: Option<Vec<String>>,
    /// Update divisor.
    #[serde(default = "default_divisor")]
    pub update_rate: u32,
    /// Activate once configured.
    #[serde(default)]
    pub autostart: bool,
    /// Controller-specific settings.
    #[serde(default)]
    pub params: toml::Table,
}

impl ControllerEntry {
    /// Factory parameters for this entry.
    pub fn params(&self) -> ControllerParams {
        ControllerParams {
            command_interfaces: InterfaceConfiguration::from_config_list(
                self.command_interfaces.as_deref(),
            ),
            state_interfaces: InterfaceConfiguration::from_config_list(
                self.state_interfaces.as_deref(),
            ),
            update_rate: self.update_rate,
            extra: self.params.clone(),
        }
    }
}

impl ManagerConfig {
    /// Load and validate a config file.
    ///
    /// # Errors
    /// Any `ConfigError` from reading, parsing or validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let cfg = Self::load(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check bounds and name uniqueness.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if !(1..=MAX_UPDATE_RATE_HZ).contains(&self.update_rate_hz) {
            return Err(ConfigError::ValidationError(format!(
                "update_rate_hz must be in 1..={MAX_UPDATE_RATE_HZ}, got {}",
                self.update_rate_hz
            )));
        }

        let mut names = HashSet::new();
        for (i, entry) in self.controllers.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "controllers[{i}].name cannot be empty"
                )));
            }
            if entry.type_name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "controllers[{i}].type cannot be empty"
                )));
            }
            if entry.update_rate == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "controllers[{i}].update_rate must be at least 1"
                )));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate controller name '{}'",
                    entry.name
                )));
            }
        }

        self.build_hardware().map(|_| ())
    }

    /// Manager period derived from `update_rate_hz`.
    pub fn period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.update_rate_hz.max(1)))
    }

    /// Timeout for startup switches; `None` waits indefinitely.
    pub fn switch_timeout(&self) -> Option<Duration> {
        match self.switch_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Static hardware layer described by `[hardware]`.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` on empty or duplicate interface names.
    pub fn build_hardware(&self) -> Result<StaticHardware, ConfigError> {
        StaticHardware::new(
            self.hardware.command_interfaces.iter().cloned(),
            self.hardware.state_interfaces.iter().cloned(),
        )
    }

    /// Names of entries flagged `autostart`, in config order.
    pub fn autostart(&self) -> Vec<String> {
        self.controllers
            .iter()
            .filter(|c| c.autostart)
            .map(|c| c.name.clone())
            .collect()
    }
}
