//! The controller manager: loaded set, administrative entry points and the
//! update-loop synchronizer.
//!
//! # Threading
//!
//! One context calls [`ControllerManager::update`] once per period. Any other
//! context may call the administrative operations concurrently:
//!
//! - `add_controller`, `load_controller`, `configure_controller` mutate the
//!   loaded set synchronously under the state lock shared with `update`.
//! - `switch_controller`, `unload_controller` validate under that lock, queue
//!   a request in a single-entry slot and block until a later `update` has
//!   applied it.
//!
//! Lock order is state lock, then slot lock. `update` holds the state lock
//! for its whole duration, so a request submitted while a cycle is running is
//! only seen by the next cycle.

use std::sync::Arc;
use std::time::Duration;

use evo_common::controller::{ControllerError, ControllerState, ReturnType};
use evo_common::hardware::HardwareInterfaces;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::controller::{
    Candidate, ControllerInterface, ControllerParams, ControllerRecord, ControllerSummary,
};
use crate::loader::ControllerLoader;
use crate::pending::{Completion, Outcome, PendingSlot};
use crate::planner::{SwitchPlan, SwitchRequest, plan_switch};
use crate::registry::ClaimRegistry;

// ─── Public views ───────────────────────────────────────────────────

/// Kind of hardware interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    /// Read-write, exclusively owned.
    Command,
    /// Read-only, shared.
    State,
}

/// One exported hardware interface and who uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceSummary {
    /// Interface name.
    pub name: String,
    /// Command or state.
    pub kind: InterfaceKind,
    /// Owning controller (command interfaces only).
    pub owner: Option<String>,
    /// Reading controllers (state interfaces only), sorted.
    pub readers: Vec<String>,
}

// ─── Manager ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ManagerState {
    controllers: Vec<ControllerRecord>,
    registry: ClaimRegistry,
    cycles: u64,
}

impl ManagerState {
    fn index_of(&self, name: &str) -> Option<usize> {
        self.controllers.iter().position(|c| c.name() == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut ControllerRecord, ControllerError> {
        self.controllers
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| ControllerError::UnknownController(name.to_string()))
    }
}

/// Orchestrates controllers over a shared pool of hardware interfaces.
pub struct ControllerManager {
    hardware: Arc<dyn HardwareInterfaces>,
    loader: ControllerLoader,
    inner: Mutex<ManagerState>,
    switch_slot: PendingSlot<SwitchPlan>,
    unload_slot: PendingSlot<String>,
}

impl ControllerManager {
    /// Manager over `hardware` with the built-in controller types.
    pub fn new(hardware: Arc<dyn HardwareInterfaces>) -> Self {
        Self::with_loader(hardware, ControllerLoader::with_builtin())
    }

    /// Manager over `hardware` with a caller-supplied loader.
    pub fn with_loader(hardware: Arc<dyn HardwareInterfaces>, loader: ControllerLoader) -> Self {
        Self {
            hardware,
            loader,
            inner: Mutex::new(ManagerState::default()),
            switch_slot: PendingSlot::new("switch"),
            unload_slot: PendingSlot::new("unload"),
        }
    }

    /// Number of completed `update` calls.
    pub fn cycles(&self) -> u64 {
        self.inner.lock().cycles
    }

    // ── Loaded set ──

    /// Take ownership of `instance` under `name`. The controller starts Unconfigured.
    ///
    /// # Errors
    /// `DuplicateController` if `name` is loaded; `InvalidRequest` if it is empty.
    pub fn add_controller(
        &self,
        instance: Box<dyn ControllerInterface>,
        name: &str,
        type_name: &str,
    ) -> Result<(), ControllerError> {
        if name.trim().is_empty() {
            return Err(ControllerError::InvalidRequest(
                "controller name cannot be empty".to_string(),
            ));
        }
        let mut state = self.inner.lock();
        if state.index_of(name).is_some() {
            return Err(ControllerError::DuplicateController(name.to_string()));
        }
        state
            .controllers
            .push(ControllerRecord::new(name, type_name, instance));
        info!(controller = name, controller_type = type_name, "controller added");
        Ok(())
    }

    /// Instantiate `type_name` through the loader and add it under `name`.
    ///
    /// # Errors
    /// `UnknownType` if the loader has no such type, otherwise as
    /// [`ControllerManager::add_controller`].
    pub fn load_controller(
        &self,
        name: &str,
        type_name: &str,
        params: &ControllerParams,
    ) -> Result<(), ControllerError> {
        if self.inner.lock().index_of(name).is_some() {
            return Err(ControllerError::DuplicateController(name.to_string()));
        }
        let instance = self.loader.create(type_name, params)?;
        self.add_controller(instance, name, type_name)
    }

    /// Run the configure hook of `name` in the caller's context.
    ///
    /// An Inactive controller is cleaned up and configured again.
    ///
    /// # Errors
    /// `UnknownController`, `InvalidStateTransition` (Active) or `HookFailure`.
    pub fn configure_controller(&self, name: &str) -> Result<(), ControllerError> {
        let mut state = self.inner.lock();
        let record = state.get_mut(name)?;
        match record.configure() {
            Ok(()) => {
                info!(
                    controller = name,
                    update_rate = record.update_rate_divisor(),
                    "controller configured"
                );
                Ok(())
            }
            Err(e) => {
                warn!(controller = name, "configure failed: {e}");
                Err(e)
            }
        }
    }

    /// Summaries of every loaded controller, in load order.
    pub fn get_loaded_controllers(&self) -> Vec<ControllerSummary> {
        let state = self.inner.lock();
        state
            .controllers
            .iter()
            .map(|c| c.summary(&state.registry))
            .collect()
    }

    /// Controller types the loader can instantiate, sorted.
    pub fn list_controller_types(&self) -> Vec<String> {
        self.loader.list_types()
    }

    /// Every exported hardware interface with its current owner or readers.
    pub fn list_hardware_interfaces(&self) -> Vec<InterfaceSummary> {
        let state = self.inner.lock();
        let command = self.hardware.command_interfaces().into_iter().map(|name| {
            InterfaceSummary {
                owner: state.registry.owner(&name).map(str::to_string),
                readers: Vec::new(),
                kind: InterfaceKind::Command,
                name,
            }
        });
        let status = self.hardware.state_interfaces().into_iter().map(|name| {
            InterfaceSummary {
                owner: None,
                readers: state.registry.readers(&name),
                kind: InterfaceKind::State,
                name,
            }
        });
        command.chain(status).collect()
    }

    // ── Deferred requests ──

    /// Validate a switch, queue it and block until an `update` applies it.
    ///
    /// Returns immediately with `Ok` when nothing is left to do after
    /// BEST_EFFORT filtering.
    ///
    /// # Errors
    /// - `AlreadyPending` if another switch is queued
    /// - validation errors from the planner, with no state change
    /// - `Timeout` if `request.timeout` elapses first; the plan is still applied later
    /// - the first failure seen while the plan was applied
    pub fn switch_controller(&self, request: SwitchRequest) -> Result<(), ControllerError> {
        let completion = {
            let state = self.inner.lock();
            if self.switch_slot.is_pending() {
                return Err(ControllerError::AlreadyPending(self.switch_slot.kind()));
            }

            let (hw_cmd, hw_state) = self.hardware_lists();
            let candidates = candidates(&state.controllers, &hw_cmd, &hw_state);
            let plan = plan_switch(&request, &candidates, &*self.hardware).inspect_err(|e| {
                warn!("switch rejected: {e}");
            })?;

            if plan.is_empty() {
                debug!("switch request has nothing to do");
                return Ok(());
            }

            info!(
                activate = ?plan.activate,
                deactivate = ?plan.deactivate,
                strictness = ?request.strictness,
                "switch queued"
            );
            self.switch_slot.submit(plan)?
        };

        completion.wait(request.timeout, self.switch_slot.kind())
    }

    /// True while a switch waits for the update loop.
    pub fn switch_pending(&self) -> bool {
        self.switch_slot.is_pending()
    }

    /// Validate an unload, queue it and block until an `update` applies it.
    ///
    /// # Errors
    /// `UnknownController`, `InvalidStateTransition` (Active), `AlreadyPending`,
    /// or a failure reported when the unload was applied.
    pub fn unload_controller(&self, name: &str) -> Result<(), ControllerError> {
        self.unload_controller_with_timeout(name, None)
    }

    /// [`ControllerManager::unload_controller`] with a caller-side timeout.
    ///
    /// # Errors
    /// As `unload_controller`, plus `Timeout`; the unload is still applied later.
    pub fn unload_controller_with_timeout(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<(), ControllerError> {
        let completion = {
            let state = self.inner.lock();
            let index = state
                .index_of(name)
                .ok_or_else(|| ControllerError::UnknownController(name.to_string()))?;
            let current = state.controllers[index].state();
            if current == ControllerState::Active {
                let err = ControllerError::InvalidStateTransition {
                    name: name.to_string(),
                    state: current,
                    operation: "unload",
                };
                warn!("unload rejected: {err}");
                return Err(err);
            }
            info!(controller = name, "unload queued");
            self.unload_slot.submit(name.to_string())?
        };

        completion.wait(timeout, self.unload_slot.kind())
    }

    /// True while an unload waits for the update loop.
    pub fn unload_pending(&self) -> bool {
        self.unload_slot.is_pending()
    }

    // ── Update loop ──

    /// One cycle: apply the pending switch, then the pending unload, then run
    /// every Active controller that is due. Waiting callers are released
    /// after the controllers have run.
    ///
    /// Returns `Error` if applying a request failed or any controller
    /// reported `Error`.
    pub fn update(&self, time: Duration, period: Duration) -> ReturnType {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let mut status = ReturnType::Ok;
        let mut done: Vec<(Arc<Completion>, Outcome)> = Vec::new();

        if let Some((plan, completion)) = self.switch_slot.take() {
            let outcome = self.apply_switch(state, &plan);
            status = status.and(outcome.clone().into());
            done.push((completion, outcome));
        }

        if let Some((name, completion)) = self.unload_slot.take() {
            let outcome = apply_unload(state, &name);
            status = status.and(outcome.clone().into());
            done.push((completion, outcome));
        }

        for record in state.controllers.iter_mut() {
            if let Some(result) = record.tick(time, period) {
                status = status.and(result);
            }
        }
        state.cycles += 1;
        drop(guard);

        for (completion, outcome) in done {
            completion.fulfill(outcome);
        }
        status
    }

    /// Apply anything still queued, then deactivate and finalize every
    /// controller. For the loop owner, after the last `update`.
    pub fn shutdown_all(&self) -> ReturnType {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let mut status = ReturnType::Ok;

        if let Some((plan, completion)) = self.switch_slot.take() {
            let outcome = self.apply_switch(state, &plan);
            status = status.and(outcome.clone().into());
            completion.fulfill(outcome);
        }
        if let Some((name, completion)) = self.unload_slot.take() {
            let outcome = apply_unload(state, &name);
            status = status.and(outcome.clone().into());
            completion.fulfill(outcome);
        }

        let ManagerState {
            controllers,
            registry,
            ..
        } = state;
        for record in controllers.iter_mut() {
            if record.state() == ControllerState::Active {
                if let Err(e) = record.deactivate(registry) {
                    warn!("{e}");
                    status = ReturnType::Error;
                }
            }
            if let Err(e) = record.finalize(registry) {
                warn!("{e}");
                status = ReturnType::Error;
            }
        }
        let count = controllers.len();
        controllers.clear();
        info!(controllers = count, "all controllers shut down");
        status
    }

    fn hardware_lists(&self) -> (Vec<String>, Vec<String>) {
        (
            self.hardware.command_interfaces(),
            self.hardware.state_interfaces(),
        )
    }

    /// Deactivations first, then activations. Failures do not roll back the
    /// transitions that already succeeded; the first one is reported.
    fn apply_switch(&self, state: &mut ManagerState, plan: &SwitchPlan) -> Outcome {
        let (hw_cmd, hw_state) = self.hardware_lists();
        let ManagerState {
            controllers,
            registry,
            ..
        } = state;
        let mut first_error: Option<ControllerError> = None;

        let mut record_error = |e: ControllerError| {
            warn!("switch step failed: {e}");
            first_error.get_or_insert(e);
        };

        for name in &plan.deactivate {
            match controllers.iter_mut().find(|c| c.name() == name) {
                Some(record) => {
                    if let Err(e) = record.deactivate(registry) {
                        record_error(e);
                    }
                }
                None => record_error(ControllerError::UnknownController(name.clone())),
            }
        }

        for name in &plan.activate {
            match controllers.iter_mut().find(|c| c.name() == name) {
                Some(record) => {
                    if let Err(e) = record.activate(
                        registry,
                        &hw_cmd,
                        &hw_state,
                        plan.activate_immediately,
                    ) {
                        record_error(e);
                    }
                }
                None => record_error(ControllerError::UnknownController(name.clone())),
            }
        }

        debug!(
            deactivated = plan.deactivate.len(),
            activated = plan.activate.len(),
            claimed = registry.claimed_count(),
            "switch applied"
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ControllerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerManager")
            .field("loader", &self.loader)
            .field("switch_pending", &self.switch_slot.is_pending())
            .field("unload_pending", &self.unload_slot.is_pending())
            .finish_non_exhaustive()
    }
}

fn candidates(controllers: &[ControllerRecord], hw_cmd: &[String], hw_state: &[String]) -> Vec<Candidate> {
    controllers
        .iter()
        .map(|c| c.candidate(hw_cmd, hw_state))
        .collect()
}

/// Finalize and remove `name`. A failing shutdown hook is reported but the
/// record is removed anyway; a controller activated since validation stays.
fn apply_unload(state: &mut ManagerState, name: &str) -> Outcome {
    let Some(index) = state.index_of(name) else {
        return Err(ControllerError::UnknownController(name.to_string()));
    };
    match state.controllers[index].finalize(&mut state.registry) {
        Err(e @ ControllerError::InvalidStateTransition { .. }) => {
            warn!("unload failed: {e}");
            Err(e)
        }
        result => {
            state.controllers.remove(index);
            info!(controller = name, "controller unloaded");
            result
        }
    }
}
