//! Controller capability trait and the manager's per-controller record.
//!
//! A [`ControllerRecord`] owns its controller instance exclusively from
//! `add_controller` until the unload that finalizes it. All lifecycle
//! transitions go through the table in [`crate::lifecycle`].

use std::time::Duration;

use evo_common::consts::DEFAULT_UPDATE_RATE_DIVISOR;
use evo_common::controller::{
    ControllerError, ControllerState, Hook, HookError, InterfaceConfiguration, ReturnType,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::lifecycle::{self, LifecycleEvent};
use crate::registry::ClaimRegistry;

/// Result of a lifecycle hook.
pub type HookResult = Result<(), HookError>;

/// Interfaces handed to a controller when it is activated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanedInterfaces {
    /// Command interfaces now exclusively owned by the controller.
    pub command: Vec<String>,
    /// State interfaces the controller reads.
    pub state: Vec<String>,
}

/// Construction parameters passed to a controller factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerParams {
    /// Command interfaces the controller should declare.
    pub command_interfaces: InterfaceConfiguration,
    /// State interfaces the controller should declare.
    pub state_interfaces: InterfaceConfiguration,
    /// Update divisor (cycles of the manager period per invocation).
    pub update_rate: u32,
    /// Free-form, controller-specific settings.
    pub extra: toml::Table,
}

/// Capability set every controller implementation provides.
///
/// Only `update` and the two interface declarations are mandatory; the
/// lifecycle hooks default to success.
///
/// # Call contexts
///
/// | Hook | Context |
/// |------|---------|
/// | `on_configure`, `on_cleanup` | caller of `configure_controller` |
/// | `on_activate`, `on_deactivate`, `on_shutdown` | update loop, before controllers run |
/// | `update` | update loop, only while Active |
pub trait ControllerInterface: Send {
    /// Command interfaces this controller needs exclusive write access to.
    fn command_interface_configuration(&self) -> InterfaceConfiguration;

    /// State interfaces this controller reads.
    fn state_interface_configuration(&self) -> InterfaceConfiguration;

    /// Update divisor: the controller runs once every N manager cycles.
    /// Zero is treated as one.
    fn update_rate(&self) -> u32 {
        DEFAULT_UPDATE_RATE_DIVISOR
    }

    /// Unconfigured → Inactive.
    fn on_configure(&mut self) -> HookResult {
        Ok(())
    }

    /// Inactive → Unconfigured, run before a re-configure.
    fn on_cleanup(&mut self) -> HookResult {
        Ok(())
    }

    /// Inactive → Active. Interfaces are already claimed.
    fn on_activate(&mut self, _interfaces: &LoanedInterfaces) -> HookResult {
        Ok(())
    }

    /// Active → Inactive. Interfaces are already released.
    fn on_deactivate(&mut self) -> HookResult {
        Ok(())
    }

    /// Called once when the controller is unloaded.
    fn on_shutdown(&mut self) -> HookResult {
        Ok(())
    }

    /// Per-cycle work. `period` is the effective period (divisor × manager period).
    fn update(&mut self, time: Duration, period: Duration) -> ReturnType;
}

/// Public view of a loaded controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerSummary {
    /// Unique name.
    pub name: String,
    /// Type identifier the controller was loaded with.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Lifecycle state.
    pub state: ControllerState,
    /// Update divisor.
    pub update_rate: u32,
    /// Command interfaces currently owned.
    pub claimed_interfaces: Vec<String>,
}

/// Snapshot of one controller used by the switch planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Controller name.
    pub name: String,
    /// Current state.
    pub state: ControllerState,
    /// Resolved command interface requirement.
    pub command: Vec<String>,
    /// Resolved state interface requirement.
    pub state_interfaces: Vec<String>,
}

/// Manager-side record of one loaded controller.
pub struct ControllerRecord {
    name: String,
    type_name: String,
    instance: Box<dyn ControllerInterface>,
    state: ControllerState,
    command_config: InterfaceConfiguration,
    state_config: InterfaceConfiguration,
    update_rate_divisor: u32,
    cycle_counter: u64,
    hold_first_cycle: bool,
}

impl ControllerRecord {
    /// Wrap a freshly instantiated controller. State starts as Unconfigured.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        instance: Box<dyn ControllerInterface>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            instance,
            state: ControllerState::Unconfigured,
            command_config: InterfaceConfiguration::none(),
            state_config: InterfaceConfiguration::none(),
            update_rate_divisor: DEFAULT_UPDATE_RATE_DIVISOR,
            cycle_counter: 0,
            hold_first_cycle: false,
        }
    }

    /// Controller name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifecycle state.
    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Update divisor recorded at configure time.
    #[inline]
    pub fn update_rate_divisor(&self) -> u32 {
        self.update_rate_divisor
    }

    fn invalid(&self, event: LifecycleEvent) -> ControllerError {
        ControllerError::InvalidStateTransition {
            name: self.name.clone(),
            state: self.state,
            operation: event.operation(),
        }
    }

    fn hook_failure(&self, hook: Hook, err: HookError) -> ControllerError {
        ControllerError::HookFailure {
            name: self.name.clone(),
            hook,
            reason: err.0,
        }
    }

    fn check(&self, event: LifecycleEvent) -> Result<ControllerState, ControllerError> {
        lifecycle::next_state(self.state, event).ok_or_else(|| self.invalid(event))
    }

    /// Run the configure hook and record the declared interface configuration
    /// and update divisor. An Inactive controller is cleaned up first.
    ///
    /// On hook failure the controller is left Unconfigured.
    pub fn configure(&mut self) -> Result<(), ControllerError> {
        let target = self.check(LifecycleEvent::Configure)?;

        if self.state == ControllerState::Inactive {
            let cleaned = self.check(LifecycleEvent::Cleanup)?;
            if let Err(e) = self.instance.on_cleanup() {
                return Err(self.hook_failure(Hook::Cleanup, e));
            }
            self.state = cleaned;
        }

        if let Err(e) = self.instance.on_configure() {
            self.state = ControllerState::Unconfigured;
            return Err(self.hook_failure(Hook::Configure, e));
        }

        self.command_config = self.instance.command_interface_configuration();
        self.state_config = self.instance.state_interface_configuration();
        self.update_rate_divisor = self.instance.update_rate().max(1);
        self.state = target;
        Ok(())
    }

    /// Resolve the declared requirements against the hardware export lists.
    pub fn candidate(&self, hw_command: &[String], hw_state: &[String]) -> Candidate {
        Candidate {
            name: self.name.clone(),
            state: self.state,
            command: self.command_config.resolve(hw_command),
            state_interfaces: self.state_config.resolve(hw_state),
        }
    }

    /// Claim interfaces, then run the activate hook.
    ///
    /// On claim conflict or hook failure the controller stays Inactive and
    /// holds nothing. With `run_this_cycle == false` the first per-cycle
    /// invocation is held back to the next update.
    pub fn activate(
        &mut self,
        registry: &mut ClaimRegistry,
        hw_command: &[String],
        hw_state: &[String],
        run_this_cycle: bool,
    ) -> Result<(), ControllerError> {
        let target = self.check(LifecycleEvent::Activate)?;

        let loaned = LoanedInterfaces {
            command: self.command_config.resolve(hw_command),
            state: self.state_config.resolve(hw_state),
        };
        registry
            .try_claim(&self.name, &loaned.command, &loaned.state)
            .map_err(|conflicts| ControllerError::ResourceConflict { conflicts })?;

        if let Err(e) = self.instance.on_activate(&loaned) {
            registry.release(&self.name);
            return Err(self.hook_failure(Hook::Activate, e));
        }

        self.state = target;
        self.cycle_counter = 0;
        self.hold_first_cycle = !run_this_cycle;
        debug!(
            controller = %self.name,
            claimed = loaned.command.len(),
            "controller activated"
        );
        Ok(())
    }

    /// Release every claim, then run the deactivate hook.
    ///
    /// The controller ends Inactive even if the hook fails; the failure is
    /// still reported.
    pub fn deactivate(&mut self, registry: &mut ClaimRegistry) -> Result<(), ControllerError> {
        let target = self.check(LifecycleEvent::Deactivate)?;

        registry.release(&self.name);
        let hook = self.instance.on_deactivate();
        self.state = target;
        debug!(controller = %self.name, "controller deactivated");
        hook.map_err(|e| self.hook_failure(Hook::Deactivate, e))
    }

    /// Run the shutdown hook and mark the record Finalized.
    ///
    /// The record is finalized even if the hook fails; the caller removes it
    /// either way.
    pub fn finalize(&mut self, registry: &mut ClaimRegistry) -> Result<(), ControllerError> {
        let target = self.check(LifecycleEvent::Shutdown)?;

        registry.release(&self.name);
        let hook = self.instance.on_shutdown();
        self.state = target;
        hook.map_err(|e| self.hook_failure(Hook::Shutdown, e))
    }

    /// Per-cycle step for this controller.
    ///
    /// Returns `None` when the controller is not Active or this is not one of
    /// its due cycles; otherwise the status of its `update` hook, called with
    /// `divisor × period`.
    pub fn tick(&mut self, time: Duration, period: Duration) -> Option<ReturnType> {
        if !lifecycle::runs_in_loop(self.state) {
            return None;
        }
        if self.hold_first_cycle {
            self.hold_first_cycle = false;
            return None;
        }

        self.cycle_counter += 1;
        if self.cycle_counter % u64::from(self.update_rate_divisor) != 0 {
            return None;
        }

        let status = self
            .instance
            .update(time, period * self.update_rate_divisor);
        if !status.is_ok() {
            warn!(controller = %self.name, "update returned ERROR");
        }
        Some(status)
    }

    /// Public view; `registry` supplies the claimed interfaces.
    pub fn summary(&self, registry: &ClaimRegistry) -> ControllerSummary {
        ControllerSummary {
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            state: self.state,
            update_rate: self.update_rate_divisor,
            claimed_interfaces: registry.claimed_by(&self.name),
        }
    }
}

impl std::fmt::Debug for ControllerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRecord")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("state", &self.state)
            .field("update_rate_divisor", &self.update_rate_divisor)
            .field("cycle_counter", &self.cycle_counter)
            .finish_non_exhaustive()
    }
}
