//! Controller lifecycle transition table.
//!
//! Unconfigured → Inactive → Active → Inactive → Finalized.
//!
//! `Configure` on an Inactive controller is a re-configure (cleanup hook,
//! then configure hook) and lands back in Inactive. Activate/Deactivate are
//! only ever driven from inside the update loop; Configure runs synchronously
//! in the caller's context.

use evo_common::controller::ControllerState;

/// Lifecycle event that may move a controller to a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Run the configure hook.
    Configure,
    /// Run the cleanup hook (Inactive → Unconfigured).
    Cleanup,
    /// Claim interfaces and run the activate hook.
    Activate,
    /// Release interfaces and run the deactivate hook.
    Deactivate,
    /// Run the shutdown hook as part of an unload.
    Shutdown,
}

impl LifecycleEvent {
    /// Verb used in `InvalidStateTransition` errors.
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Cleanup => "clean up",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Shutdown => "unload",
        }
    }
}

/// Target state of `event` applied in `state`, or `None` if the transition
/// does not exist.
pub const fn next_state(state: ControllerState, event: LifecycleEvent) -> Option<ControllerState> {
    use ControllerState::*;
    use LifecycleEvent::*;

    match (state, event) {
        (Unconfigured, Configure) => Some(Inactive),
        (Inactive, Configure) => Some(Inactive),
        (Inactive, Cleanup) => Some(Unconfigured),
        (Inactive, Activate) => Some(Active),
        (Active, Deactivate) => Some(Inactive),
        (Unconfigured, Shutdown) | (Inactive, Shutdown) => Some(Finalized),
        _ => None,
    }
}

/// True if the per-cycle hook may be invoked in `state`.
#[inline]
pub const fn runs_in_loop(state: ControllerState) -> bool {
    matches!(state, ControllerState::Active)
}
