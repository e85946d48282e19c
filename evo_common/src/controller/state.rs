//! Lifecycle state, switch strictness and cycle status enums.
//!
//! All enums use `#[repr(u8)]` so they can be reported compactly by
//! transport layers (list/switch services) without a string table.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Lifecycle ──────────────────────────────────────────────────────

/// Primary lifecycle state of a loaded controller.
///
/// Allowed transitions: Unconfigured → Inactive → Active → Inactive → Finalized.
/// There is no direct Unconfigured → Active or Active → Finalized path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControllerState {
    /// Freshly added, configure hook not yet run.
    Unconfigured = 1,
    /// Configured, holds no claims, never updated.
    Inactive = 2,
    /// Holds its command claims and is updated by the loop.
    Active = 3,
    /// Unloaded; the record leaves the manager in the same cycle.
    Finalized = 4,
}

impl ControllerState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Unconfigured),
            2 => Some(Self::Inactive),
            3 => Some(Self::Active),
            4 => Some(Self::Finalized),
            _ => None,
        }
    }

    /// Lower-case label used in logs and list output.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Finalized => "finalized",
        }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::Unconfigured
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─── Switch Policy ──────────────────────────────────────────────────

/// How a switch request treats unknown or conflicting entries.
///
/// Wire values match the controller-manager service definition
/// (`BEST_EFFORT = 1`, `STRICT = 2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Strictness {
    /// Drop invalid entries and apply the rest.
    BestEffort = 1,
    /// Reject the whole request on the first invalid entry.
    Strict = 2,
}

impl Strictness {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::BestEffort),
            2 => Some(Self::Strict),
            _ => None,
        }
    }

    /// True for [`Strictness::Strict`].
    #[inline]
    pub const fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl Default for Strictness {
    fn default() -> Self {
        Self::Strict
    }
}

// ─── Cycle Status ───────────────────────────────────────────────────

/// Status reported by a controller's per-cycle hook and by the manager's
/// `update()` aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReturnType {
    /// Cycle completed normally.
    Ok = 0,
    /// At least one participant reported a failure.
    Error = 1,
}

impl ReturnType {
    /// True for [`ReturnType::Ok`].
    #[inline]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Combine two statuses: `Error` wins.
    #[inline]
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Ok, Self::Ok) => Self::Ok,
            _ => Self::Error,
        }
    }
}

impl Default for ReturnType {
    fn default() -> Self {
        Self::Ok
    }
}

impl<E> From<Result<(), E>> for ReturnType {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(_) => Self::Error,
        }
    }
}
