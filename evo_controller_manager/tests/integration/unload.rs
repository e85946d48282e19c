//! Deferred unload.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use evo_common::controller::{ControllerError, ControllerState, Hook, Strictness};

use super::common::*;

fn unload_in_background(
    cm: &Arc<evo_controller_manager::ControllerManager>,
    name: &'static str,
) -> thread::JoinHandle<Result<(), ControllerError>> {
    let handle = {
        let cm = Arc::clone(cm);
        thread::spawn(move || cm.unload_controller(name))
    };
    while !cm.unload_pending() && !handle.is_finished() {
        thread::sleep(Duration::from_millis(1));
    }
    handle
}

#[test]
fn unload_active_fails_then_succeeds_after_stop() {
    let cm = manager();
    let probe = add_configured(&cm, "c", &["joint1/position"], 1);
    switch(&cm, start(&["c"], Strictness::Strict)).0.unwrap();

    let err = cm.unload_controller("c").unwrap_err();
    assert!(matches!(
        err,
        ControllerError::InvalidStateTransition { operation: "unload", state: ControllerState::Active, .. }
    ));
    assert!(!cm.unload_pending());
    assert_eq!(state_of(&cm, "c"), Some(ControllerState::Active));

    switch(&cm, stop(&["c"], Strictness::Strict)).0.unwrap();

    let handle = unload_in_background(&cm, "c");
    assert!(cm.unload_pending());
    cm.update(Duration::ZERO, PERIOD);
    assert_eq!(handle.join().unwrap(), Ok(()));

    assert!(cm.get_loaded_controllers().is_empty());
    assert_eq!(Probe::count(&probe.shutdowns), 1);
    assert!(cm.list_hardware_interfaces().iter().all(|i| i.owner.is_none() && i.readers.is_empty()));
}

#[test]
fn unload_unconfigured_controller() {
    let cm = manager();
    let (controller, probe) = probe(&[], 1);
    cm.add_controller(controller, "fresh", "probe").unwrap();

    let handle = unload_in_background(&cm, "fresh");
    cm.update(Duration::ZERO, PERIOD);
    assert_eq!(handle.join().unwrap(), Ok(()));
    assert_eq!(state_of(&cm, "fresh"), None);
    assert_eq!(Probe::count(&probe.shutdowns), 1);
}

#[test]
fn unload_unknown_controller() {
    let cm = manager();
    assert_eq!(
        cm.unload_controller("ghost"),
        Err(ControllerError::UnknownController("ghost".into()))
    );
}

#[test]
fn unload_waits_for_the_next_cycle() {
    let cm = manager();
    add_configured(&cm, "c", &[], 1);

    let handle = unload_in_background(&cm, "c");
    thread::sleep(Duration::from_millis(100));
    assert!(!handle.is_finished());
    assert_eq!(state_of(&cm, "c"), Some(ControllerState::Inactive));

    cm.update(Duration::ZERO, PERIOD);
    assert_eq!(handle.join().unwrap(), Ok(()));
    assert_eq!(state_of(&cm, "c"), None);
}

#[test]
fn second_unload_while_pending_fails_fast() {
    let cm = manager();
    add_configured(&cm, "a", &[], 1);
    add_configured(&cm, "b", &[], 1);

    assert_eq!(
        cm.unload_controller_with_timeout("a", Some(Duration::from_millis(20))),
        Err(ControllerError::Timeout("unload"))
    );
    assert!(cm.unload_pending());
    assert_eq!(
        cm.unload_controller("b"),
        Err(ControllerError::AlreadyPending("unload"))
    );

    // The timed-out unload is still applied.
    cm.update(Duration::ZERO, PERIOD);
    assert_eq!(state_of(&cm, "a"), None);
    assert_eq!(state_of(&cm, "b"), Some(ControllerState::Inactive));
}

#[test]
fn failing_shutdown_hook_still_removes_record() {
    let cm = manager();
    let probe = add_configured(&cm, "c", &[], 1);
    probe.fail_shutdown.store(true, Ordering::SeqCst);

    let handle = unload_in_background(&cm, "c");
    let status = cm.update(Duration::ZERO, PERIOD);
    assert!(!status.is_ok());
    assert!(matches!(
        handle.join().unwrap(),
        Err(ControllerError::HookFailure { hook: Hook::Shutdown, .. })
    ));
    assert_eq!(state_of(&cm, "c"), None);
}

#[test]
fn switch_and_unload_queues_are_independent() {
    let cm = manager();
    let runner = add_configured(&cm, "runner", &["joint1/position"], 1);
    add_configured(&cm, "spare", &[], 1);

    let unload = unload_in_background(&cm, "spare");
    let switch = switch_in_background(&cm, start(&["runner"], Strictness::Strict));
    assert!(cm.unload_pending() && cm.switch_pending());

    cm.update(Duration::ZERO, PERIOD);
    assert_eq!(unload.join().unwrap(), Ok(()));
    assert_eq!(switch.join().unwrap(), Ok(()));
    assert_eq!(state_of(&cm, "runner"), Some(ControllerState::Active));
    assert_eq!(state_of(&cm, "spare"), None);
    assert_eq!(runner.updates(), 1);
}
