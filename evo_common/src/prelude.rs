//! Common re-exports.
//!
//! ```rust
//! use evo_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_UPDATE_RATE_DIVISOR, DEFAULT_UPDATE_RATE_HZ};

// ─── Controllers ────────────────────────────────────────────────────
pub use crate::controller::{
    ClaimConflict, ControllerError, ControllerState, Hook, HookError, InterfaceConfiguration,
    InterfaceConfigurationType, ReturnType, Strictness,
};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hardware::{HardwareInterfaces, StaticHardware};

/// Default manager period as `Duration` (matches `DEFAULT_UPDATE_RATE_HZ`).
pub const DEFAULT_PERIOD: Duration =
    Duration::from_micros(1_000_000 / crate::consts::DEFAULT_UPDATE_RATE_HZ as u64);
