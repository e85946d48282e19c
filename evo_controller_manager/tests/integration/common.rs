//! Shared fixtures: probe controllers, a three-joint hardware layer and
//! helpers to run a switch across threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use evo_common::controller::{
    ControllerError, ControllerState, HookError, InterfaceConfiguration, ReturnType, Strictness,
};
use evo_common::hardware::StaticHardware;
use evo_controller_manager::{
    ControllerInterface, ControllerManager, HookResult, LoanedInterfaces, SwitchRequest,
};

pub const PERIOD: Duration = Duration::from_millis(10);

/// Counters and failure switches shared between a test and its controller.
#[derive(Debug, Default)]
pub struct Probe {
    pub configures: AtomicU32,
    pub cleanups: AtomicU32,
    pub activates: AtomicU32,
    pub deactivates: AtomicU32,
    pub shutdowns: AtomicU32,
    pub updates: AtomicU32,
    pub last_period_ns: AtomicU64,
    pub fail_activate: AtomicBool,
    pub fail_shutdown: AtomicBool,
    pub fail_update: AtomicBool,
}

impl Probe {
    pub fn updates(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

pub struct ProbeController {
    command: InterfaceConfiguration,
    state: InterfaceConfiguration,
    rate: u32,
    probe: Arc<Probe>,
}

fn fail_if(flag: &AtomicBool, reason: &str) -> HookResult {
    if flag.load(Ordering::SeqCst) {
        Err(HookError::new(reason))
    } else {
        Ok(())
    }
}

impl ControllerInterface for ProbeController {
    fn command_interface_configuration(&self) -> InterfaceConfiguration {
        self.command.clone()
    }

    fn state_interface_configuration(&self) -> InterfaceConfiguration {
        self.state.clone()
    }

    fn update_rate(&self) -> u32 {
        self.rate
    }

    fn on_configure(&mut self) -> HookResult {
        self.probe.configures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_cleanup(&mut self) -> HookResult {
        self.probe.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_activate(&mut self, _interfaces: &LoanedInterfaces) -> HookResult {
        fail_if(&self.probe.fail_activate, "activation refused")?;
        self.probe.activates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_deactivate(&mut self) -> HookResult {
        self.probe.deactivates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_shutdown(&mut self) -> HookResult {
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        fail_if(&self.probe.fail_shutdown, "shutdown refused")
    }

    fn update(&mut self, _time: Duration, period: Duration) -> ReturnType {
        self.probe.updates.fetch_add(1, Ordering::SeqCst);
        self.probe
            .last_period_ns
            .store(period.as_nanos() as u64, Ordering::SeqCst);
        if self.probe.fail_update.load(Ordering::SeqCst) {
            ReturnType::Error
        } else {
            ReturnType::Ok
        }
    }
}

/// Probe controller commanding `command` (individual list) every `rate` cycles.
pub fn probe(command: &[&str], rate: u32) -> (Box<dyn ControllerInterface>, Arc<Probe>) {
    probe_with(
        InterfaceConfiguration::individual(command.iter().copied()),
        InterfaceConfiguration::individual(["joint1/velocity"]),
        rate,
    )
}

pub fn probe_with(
    command: InterfaceConfiguration,
    state: InterfaceConfiguration,
    rate: u32,
) -> (Box<dyn ControllerInterface>, Arc<Probe>) {
    let probe = Arc::new(Probe::default());
    let controller = ProbeController {
        command,
        state,
        rate,
        probe: Arc::clone(&probe),
    };
    (Box::new(controller), probe)
}

pub fn manager() -> Arc<ControllerManager> {
    let hw = StaticHardware::new(
        ["joint1/position", "joint2/velocity", "joint3/effort"],
        [
            "joint1/position",
            "joint1/velocity",
            "joint2/position",
            "joint2/velocity",
        ],
    )
    .expect("valid hardware");
    Arc::new(ControllerManager::new(Arc::new(hw)))
}

/// Add a probe controller and configure it.
pub fn add_configured(
    cm: &ControllerManager,
    name: &str,
    command: &[&str],
    rate: u32,
) -> Arc<Probe> {
    let (controller, probe) = probe(command, rate);
    cm.add_controller(controller, name, "probe").expect("add");
    cm.configure_controller(name).expect("configure");
    probe
}

pub fn start(names: &[&str], strictness: Strictness) -> SwitchRequest {
    SwitchRequest::new(names.iter().copied(), Vec::<String>::new(), strictness)
}

pub fn stop(names: &[&str], strictness: Strictness) -> SwitchRequest {
    SwitchRequest::new(Vec::<String>::new(), names.iter().copied(), strictness)
}

/// Issue `request` from another thread; returns once it is queued or has
/// already finished (validation error, nothing to do).
pub fn switch_in_background(
    cm: &Arc<ControllerManager>,
    request: SwitchRequest,
) -> JoinHandle<Result<(), ControllerError>> {
    let handle = {
        let cm = Arc::clone(cm);
        thread::spawn(move || cm.switch_controller(request))
    };
    while !cm.switch_pending() && !handle.is_finished() {
        thread::sleep(Duration::from_millis(1));
    }
    handle
}

/// Run a switch to completion, driving exactly one `update` if it was queued.
/// Returns the switch result and the status of that update, if any.
pub fn switch(
    cm: &Arc<ControllerManager>,
    request: SwitchRequest,
) -> (Result<(), ControllerError>, Option<ReturnType>) {
    let handle = switch_in_background(cm, request);
    let status = cm.switch_pending().then(|| cm.update(Duration::ZERO, PERIOD));
    let result = handle.join().expect("switch thread panicked");
    (result, status)
}

pub fn state_of(cm: &ControllerManager, name: &str) -> Option<ControllerState> {
    cm.get_loaded_controllers()
        .into_iter()
        .find(|c| c.name == name)
        .map(|c| c.state)
}

pub fn active_count(cm: &ControllerManager) -> usize {
    cm.get_loaded_controllers()
        .iter()
        .filter(|c| c.state == ControllerState::Active)
        .count()
}

/// Command interfaces held by Active controllers never overlap.
pub fn assert_claims_disjoint(cm: &ControllerManager) {
    let mut seen: Vec<String> = Vec::new();
    for c in cm.get_loaded_controllers() {
        if c.state != ControllerState::Active {
            assert!(c.claimed_interfaces.is_empty(), "{} holds claims while {}", c.name, c.state);
        }
        for iface in c.claimed_interfaces {
            assert!(!seen.contains(&iface), "{iface} claimed twice");
            seen.push(iface);
        }
    }
}

pub fn tick(cm: &ControllerManager, n: usize) -> Vec<ReturnType> {
    (0..n).map(|_| cm.update(Duration::ZERO, PERIOD)).collect()
}
