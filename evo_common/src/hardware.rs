//! Hardware-layer capability consumed by the controller manager.
//!
//! The manager never reads or writes signal values itself; it only needs to
//! know which command and state interfaces exist so that `All` requirements
//! can be resolved and unavailable interfaces rejected.

use std::collections::HashSet;

use crate::config::ConfigError;

/// Interface enumeration exposed by a hardware layer.
///
/// Implementations must be cheap to call; the manager queries them while
/// validating switch requests, outside the update loop.
pub trait HardwareInterfaces: Send + Sync {
    /// Every command (read-write) interface, in a stable order.
    fn command_interfaces(&self) -> Vec<String>;

    /// Every state (read-only) interface, in a stable order.
    fn state_interfaces(&self) -> Vec<String>;

    /// True if `name` is an exported command interface.
    fn has_command_interface(&self, name: &str) -> bool {
        self.command_interfaces().iter().any(|n| n == name)
    }

    /// True if `name` is an exported state interface.
    fn has_state_interface(&self, name: &str) -> bool {
        self.state_interfaces().iter().any(|n| n == name)
    }
}

/// Fixed interface list, typically built from the `[hardware]` config table.
#[derive(Debug, Clone, Default)]
pub struct StaticHardware {
    command: Vec<String>,
    state: Vec<String>,
}

impl StaticHardware {
    /// Build from explicit lists.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if a name is empty or listed twice
    /// within the same kind.
    pub fn new<C, S>(command: C, state: S) -> Result<Self, ConfigError>
    where
        C: IntoIterator,
        C::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let command = unique_names("command", command)?;
        let state = unique_names("state", state)?;
        Ok(Self { command, state })
    }
}

impl HardwareInterfaces for StaticHardware {
    fn command_interfaces(&self) -> Vec<String> {
        self.command.clone()
    }

    fn state_interfaces(&self) -> Vec<String> {
        self.state.clone()
    }

    fn has_command_interface(&self, name: &str) -> bool {
        self.command.iter().any(|n| n == name)
    }

    fn has_state_interface(&self, name: &str) -> bool {
        self.state.iter().any(|n| n == name)
    }
}

fn unique_names<I>(kind: &str, names: I) -> Result<Vec<String>, ConfigError>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let name: String = name.into();
        if name.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "empty {kind} interface name"
            )));
        }
        if !seen.insert(name.clone()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate {kind} interface '{name}'"
            )));
        }
        out.push(name);
    }
    Ok(out)
}
