//! Switch planner.
//!
//! Turns a [`SwitchRequest`] into an ordered [`SwitchPlan`] (all
//! deactivations, then all activations) or rejects it. Pure: it reads
//! controller snapshots and asks the hardware layer which interfaces exist;
//! it mutates nothing.
//!
//! Validation order:
//! 1. start/stop overlap and duplicate names → `InvalidRequest` (any strictness)
//! 2. unknown names
//! 3. lifecycle state (stop ⇒ Active, start ⇒ Inactive)
//! 4. interface availability on the hardware layer
//! 5. command-interface conflicts against survivors and earlier starts
//!
//! Steps 2–5 fail the whole request under STRICT and drop the offending
//! entry under BEST_EFFORT. When BEST_EFFORT resolves a conflict, controllers
//! that stay active win over new starts, and earlier starts win over later
//! ones.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use evo_common::controller::{ClaimConflict, ControllerError, ControllerState, Strictness};
use evo_common::hardware::HardwareInterfaces;
use tracing::warn;

use crate::controller::Candidate;

/// A switch request as submitted by an external caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchRequest {
    /// Controllers to activate, in priority order.
    pub start: Vec<String>,
    /// Controllers to deactivate.
    pub stop: Vec<String>,
    /// Unknown/conflicting entry policy.
    pub strictness: Strictness,
    /// Newly activated controllers run in the cycle that activates them.
    pub activate_immediately: bool,
    /// How long the caller waits for the update loop; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl SwitchRequest {
    /// New request with `activate_immediately = true` and no timeout.
    pub fn new<S, T>(start: S, stop: T, strictness: Strictness) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            start: start.into_iter().map(Into::into).collect(),
            stop: stop.into_iter().map(Into::into).collect(),
            strictness,
            activate_immediately: true,
            timeout: None,
        }
    }

    /// Set `activate_immediately`.
    #[must_use]
    pub fn with_activate_immediately(mut self, immediately: bool) -> Self {
        self.activate_immediately = immediately;
        self
    }

    /// Set the caller-side timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Validated transition plan, applied by the update loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchPlan {
    /// Deactivated first, in this order.
    pub deactivate: Vec<String>,
    /// Activated second, in this order.
    pub activate: Vec<String>,
    /// Copied from the request.
    pub activate_immediately: bool,
}

impl SwitchPlan {
    /// True if the plan changes nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deactivate.is_empty() && self.activate.is_empty()
    }
}

/// Validate `request` against the loaded controllers and build a plan.
///
/// # Errors
/// `InvalidRequest` for overlapping or duplicate names; under STRICT also
/// `UnknownController`, `InvalidStateTransition`, `UnavailableInterface` and
/// `ResourceConflict`.
pub fn plan_switch(
    request: &SwitchRequest,
    controllers: &[Candidate],
    hardware: &dyn HardwareInterfaces,
) -> Result<SwitchPlan, ControllerError> {
    check_shape(request)?;
    let strict = request.strictness.is_strict();
    let by_name: HashMap<&str, &Candidate> =
        controllers.iter().map(|c| (c.name.as_str(), c)).collect();

    // ── Stop list ──
    let mut stop: Vec<&Candidate> = Vec::with_capacity(request.stop.len());
    for name in &request.stop {
        let Some(c) = by_name.get(name.as_str()).copied() else {
            reject_or_drop(strict, ControllerError::UnknownController(name.clone()))?;
            continue;
        };
        if c.state != ControllerState::Active {
            reject_or_drop(strict, invalid(c, "deactivate"))?;
            continue;
        }
        stop.push(c);
    }

    // ── Start list: existence, state, availability ──
    let mut start: Vec<&Candidate> = Vec::with_capacity(request.start.len());
    for name in &request.start {
        let Some(c) = by_name.get(name.as_str()).copied() else {
            reject_or_drop(strict, ControllerError::UnknownController(name.clone()))?;
            continue;
        };
        if c.state != ControllerState::Inactive {
            reject_or_drop(strict, invalid(c, "activate"))?;
            continue;
        }
        if let Some(err) = missing_interface(c, hardware) {
            reject_or_drop(strict, err)?;
            continue;
        }
        start.push(c);
    }

    // ── Conflicts ──
    let stopping: HashSet<&str> = stop.iter().map(|c| c.name.as_str()).collect();
    let mut claimed: HashMap<&str, &str> = HashMap::new();
    for c in controllers
        .iter()
        .filter(|c| c.state == ControllerState::Active && !stopping.contains(c.name.as_str()))
    {
        for iface in &c.command {
            claimed.insert(iface.as_str(), c.name.as_str());
        }
    }

    let mut accepted: Vec<&Candidate> = Vec::with_capacity(start.len());
    let mut all_conflicts: Vec<ClaimConflict> = Vec::new();
    for c in start {
        let conflicts: Vec<ClaimConflict> = c
            .command
            .iter()
            .filter_map(|iface| {
                claimed.get(iface.as_str()).map(|owner| ClaimConflict {
                    interface: iface.clone(),
                    owner: (*owner).to_string(),
                    requested_by: c.name.clone(),
                })
            })
            .collect();

        if conflicts.is_empty() {
            for iface in &c.command {
                claimed.insert(iface.as_str(), c.name.as_str());
            }
            accepted.push(c);
        } else if strict {
            all_conflicts.extend(conflicts);
        } else {
            warn!(
                controller = %c.name,
                "dropping start request: {}",
                ControllerError::ResourceConflict { conflicts }
            );
        }
    }

    if !all_conflicts.is_empty() {
        return Err(ControllerError::ResourceConflict {
            conflicts: all_conflicts,
        });
    }

    Ok(SwitchPlan {
        deactivate: stop.iter().map(|c| c.name.clone()).collect(),
        activate: accepted.iter().map(|c| c.name.clone()).collect(),
        activate_immediately: request.activate_immediately,
    })
}

/// Reject overlapping start/stop names and duplicates within a list.
fn check_shape(request: &SwitchRequest) -> Result<(), ControllerError> {
    for (label, list) in [("start", &request.start), ("stop", &request.stop)] {
        let mut seen = HashSet::new();
        if let Some(dup) = list.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(ControllerError::InvalidRequest(format!(
                "'{dup}' listed twice in {label} list"
            )));
        }
    }
    if let Some(both) = request.start.iter().find(|n| request.stop.contains(n)) {
        return Err(ControllerError::InvalidRequest(format!(
            "'{both}' is in both start and stop lists"
        )));
    }
    Ok(())
}

fn reject_or_drop(strict: bool, err: ControllerError) -> Result<(), ControllerError> {
    if strict {
        Err(err)
    } else {
        warn!("best effort switch, ignoring: {err}");
        Ok(())
    }
}

fn invalid(c: &Candidate, operation: &'static str) -> ControllerError {
    ControllerError::InvalidStateTransition {
        name: c.name.clone(),
        state: c.state,
        operation,
    }
}

fn missing_interface(c: &Candidate, hardware: &dyn HardwareInterfaces) -> Option<ControllerError> {
    let missing_cmd = c.command.iter().find(|i| !hardware.has_command_interface(i));
    let missing_state = c
        .state_interfaces
        .iter()
        .find(|i| !hardware.has_state_interface(i));
    missing_cmd
        .or(missing_state)
        .map(|iface| ControllerError::UnavailableInterface {
            controller: c.name.clone(),
            interface: iface.clone(),
        })
}
