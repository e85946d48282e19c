//! Blocking handoff between administrative callers and the update loop.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use evo_common::controller::{ControllerError, ControllerState, Strictness};
use evo_controller_manager::CycleRunner;

use super::common::*;

#[test]
fn switch_completes_only_after_next_update() {
    let cm = manager();
    let probe = add_configured(&cm, "c", &["joint1/position"], 1);

    let handle = switch_in_background(&cm, start(&["c"], Strictness::Strict));
    thread::sleep(Duration::from_millis(100));
    assert!(!handle.is_finished());
    assert!(cm.switch_pending());
    assert_eq!(state_of(&cm, "c"), Some(ControllerState::Inactive));

    cm.update(Duration::ZERO, PERIOD);
    assert_eq!(handle.join().unwrap(), Ok(()));
    assert!(!cm.switch_pending());
    assert_eq!(state_of(&cm, "c"), Some(ControllerState::Active));
    assert_eq!(probe.updates(), 1);
}

#[test]
fn second_switch_while_pending_fails_fast() {
    let cm = manager();
    add_configured(&cm, "a", &["joint1/position"], 1);
    add_configured(&cm, "b", &["joint2/velocity"], 1);

    let first = switch_in_background(&cm, start(&["a"], Strictness::Strict));
    assert_eq!(
        cm.switch_controller(start(&["b"], Strictness::Strict)),
        Err(ControllerError::AlreadyPending("switch"))
    );
    // Fails fast even for a request that would be a no-op.
    assert_eq!(
        cm.switch_controller(start(&["ghost"], Strictness::BestEffort)),
        Err(ControllerError::AlreadyPending("switch"))
    );

    cm.update(Duration::ZERO, PERIOD);
    assert_eq!(first.join().unwrap(), Ok(()));
    assert_eq!(state_of(&cm, "b"), Some(ControllerState::Inactive));
}

#[test]
fn timed_out_switch_is_still_applied() {
    let cm = manager();
    let probe = add_configured(&cm, "c", &["joint1/position"], 1);

    let request =
        start(&["c"], Strictness::Strict).with_timeout(Some(Duration::from_millis(30)));
    assert_eq!(
        cm.switch_controller(request),
        Err(ControllerError::Timeout("switch"))
    );
    assert!(cm.switch_pending());
    assert_eq!(state_of(&cm, "c"), Some(ControllerState::Inactive));

    cm.update(Duration::ZERO, PERIOD);
    assert_eq!(state_of(&cm, "c"), Some(ControllerState::Active));
    assert_eq!(probe.updates(), 1);
}

#[test]
fn switch_against_running_loop() {
    let cm = manager();
    let probe = add_configured(&cm, "c", &["joint1/position"], 1);

    let mut runner = CycleRunner::new(Arc::clone(&cm), Duration::from_millis(1)).unwrap();
    let running = runner.running_flag();
    let loop_thread = thread::spawn(move || runner.run().cycle_count);

    let request = start(&["c"], Strictness::Strict).with_timeout(Some(Duration::from_secs(5)));
    assert_eq!(cm.switch_controller(request), Ok(()));
    assert_eq!(state_of(&cm, "c"), Some(ControllerState::Active));

    let request = stop(&["c"], Strictness::Strict).with_timeout(Some(Duration::from_secs(5)));
    assert_eq!(cm.switch_controller(request), Ok(()));
    let ran = probe.updates();
    assert!(ran >= 1);

    running.store(false, Ordering::SeqCst);
    let cycles = loop_thread.join().unwrap();
    assert!(cycles >= 2);
    assert_eq!(probe.updates(), ran);
}

#[test]
fn concurrent_switches_keep_claims_exclusive() {
    let cm = manager();
    add_configured(&cm, "a", &["joint1/position", "joint2/velocity"], 1);
    add_configured(&cm, "b", &["joint1/position"], 1);
    add_configured(&cm, "c", &["joint2/velocity", "joint3/effort"], 2);

    let mut runner = CycleRunner::new(Arc::clone(&cm), Duration::from_millis(1)).unwrap();
    let running = runner.running_flag();
    let loop_thread = thread::spawn(move || runner.run().cycle_count);

    let admins: Vec<_> = [["a", "b"], ["b", "c"], ["c", "a"]]
        .into_iter()
        .map(|pair| {
            let cm = Arc::clone(&cm);
            thread::spawn(move || {
                for i in 0..20 {
                    let (on, off) = if i % 2 == 0 { (pair[0], pair[1]) } else { (pair[1], pair[0]) };
                    let request = evo_controller_manager::SwitchRequest::new(
                        [on],
                        Vec::<String>::new(),
                        Strictness::BestEffort,
                    )
                    .with_timeout(Some(Duration::from_secs(5)));
                    // Contention is expected: AlreadyPending is fine here.
                    let _ = cm.switch_controller(request);
                    let request = evo_controller_manager::SwitchRequest::new(
                        Vec::<String>::new(),
                        [off],
                        Strictness::BestEffort,
                    )
                    .with_timeout(Some(Duration::from_secs(5)));
                    let _ = cm.switch_controller(request);
                    assert_claims_disjoint(&cm);
                }
            })
        })
        .collect();

    for admin in admins {
        admin.join().unwrap();
    }
    running.store(false, Ordering::SeqCst);
    loop_thread.join().unwrap();

    assert!(!cm.switch_pending());
    assert_claims_disjoint(&cm);
}
