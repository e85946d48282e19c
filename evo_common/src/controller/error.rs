//! Error types for controller administration.
//!
//! Validation errors are returned synchronously with no state change.
//! `HookFailure` is the only kind produced while a plan is being applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::state::ControllerState;

/// One command interface that could not be claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimConflict {
    /// Command interface name.
    pub interface: String,
    /// Controller that already owns (or will own) the interface.
    pub owner: String,
    /// Controller that asked for it.
    pub requested_by: String,
}

impl fmt::Display for ClaimConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' requested by '{}' is owned by '{}'",
            self.interface, self.requested_by, self.owner
        )
    }
}

/// Which controller hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    /// `on_configure`.
    Configure,
    /// `on_cleanup`.
    Cleanup,
    /// `on_activate`.
    Activate,
    /// `on_deactivate`.
    Deactivate,
    /// `on_shutdown`.
    Shutdown,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configure => "configure",
            Self::Cleanup => "cleanup",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Failure reported by a controller's own lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    /// Build from anything printable.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Error kinds returned by controller manager operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// No controller with this name is loaded.
    #[error("Unknown controller: {0}")]
    UnknownController(String),

    /// The loader has no factory for this type.
    #[error("Unknown controller type: {0}")]
    UnknownType(String),

    /// A controller with this name is already loaded.
    #[error("Controller already loaded: {0}")]
    DuplicateController(String),

    /// Command interfaces requested by more than one controller.
    #[error("Resource conflict: {}", join_conflicts(.conflicts))]
    ResourceConflict {
        /// Every conflicting interface found.
        conflicts: Vec<ClaimConflict>,
    },

    /// A required interface is not exported by the hardware layer.
    #[error("Controller '{controller}' requires unavailable interface '{interface}'")]
    UnavailableInterface {
        /// Requesting controller.
        controller: String,
        /// Missing interface.
        interface: String,
    },

    /// Operation not allowed in the controller's current state.
    #[error("Cannot {operation} controller '{name}' in state {state}")]
    InvalidStateTransition {
        /// Controller name.
        name: String,
        /// State at the time of the request.
        state: ControllerState,
        /// Requested operation (e.g. "unload", "activate").
        operation: &'static str,
    },

    /// Malformed request (duplicate names, start/stop overlap).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A request of the same kind is still outstanding.
    #[error("Another {0} request is already pending")]
    AlreadyPending(&'static str),

    /// The caller stopped waiting; the request is still applied later.
    #[error("Timed out waiting for the update loop to apply the {0} request")]
    Timeout(&'static str),

    /// A controller hook reported failure.
    #[error("Controller '{name}' failed in {hook}: {reason}")]
    HookFailure {
        /// Controller name.
        name: String,
        /// Failing hook.
        hook: Hook,
        /// Reason given by the controller.
        reason: String,
    },
}

impl ControllerError {
    /// True for errors detected before any state mutation.
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::HookFailure { .. } | Self::Timeout(_))
    }
}

fn join_conflicts(conflicts: &[ClaimConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
