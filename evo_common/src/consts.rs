//! System-wide constants for the controller manager.
//!
//! Single source of truth for numeric limits and defaults.

/// Default manager loop frequency [Hz].
pub const DEFAULT_UPDATE_RATE_HZ: u32 = 100;

/// Highest accepted manager loop frequency [Hz].
pub const MAX_UPDATE_RATE_HZ: u32 = 10_000;

/// Default per-controller update divisor (every cycle).
pub const DEFAULT_UPDATE_RATE_DIVISOR: u32 = 1;

/// Default service name when `[shared]` is omitted.
pub const DEFAULT_SERVICE_NAME: &str = "controller_manager";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/evo/controller_manager.toml";

/// Loop statistics are logged every this many cycles.
pub const STATS_LOG_INTERVAL_CYCLES: u64 = 1000;
