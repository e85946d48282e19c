//! Per-controller update divisor.

use std::sync::atomic::Ordering;

use evo_common::controller::Strictness;

use super::common::*;

#[test]
fn divisor_four_runs_on_calls_four_and_eight() {
    let cm = manager();
    let probe = add_configured(&cm, "slow", &["joint1/position"], 4);

    // Call 1 applies the switch and is the controller's first cycle.
    let (result, _) = switch(&cm, start(&["slow"], Strictness::Strict));
    assert_eq!(result, Ok(()));

    let mut seen = vec![probe.updates()];
    for _ in 2..=8 {
        tick(&cm, 1);
        seen.push(probe.updates());
    }
    assert_eq!(seen, vec![0, 0, 0, 1, 1, 1, 1, 2]);
    assert_eq!(
        probe.last_period_ns.load(Ordering::SeqCst),
        (PERIOD * 4).as_nanos() as u64
    );
}

#[test]
fn deferred_activation_skips_the_switch_cycle() {
    let cm = manager();
    let probe = add_configured(&cm, "slow", &["joint1/position"], 4);

    let request = start(&["slow"], Strictness::Strict).with_activate_immediately(false);
    let (result, _) = switch(&cm, request);
    assert_eq!(result, Ok(()));
    assert_eq!(probe.updates(), 0);

    let mut seen = Vec::new();
    for _ in 1..=8 {
        tick(&cm, 1);
        seen.push(probe.updates());
    }
    assert_eq!(seen, vec![0, 0, 0, 1, 1, 1, 1, 2]);
}

#[test]
fn default_divisor_runs_every_cycle_with_base_period() {
    let cm = manager();
    let probe = add_configured(&cm, "fast", &["joint1/position"], 1);
    switch(&cm, start(&["fast"], Strictness::Strict)).0.unwrap();
    tick(&cm, 9);
    assert_eq!(probe.updates(), 10);
    assert_eq!(
        probe.last_period_ns.load(Ordering::SeqCst),
        PERIOD.as_nanos() as u64
    );
}

#[test]
fn zero_divisor_behaves_like_one() {
    let cm = manager();
    let probe = add_configured(&cm, "zero", &[], 0);
    switch(&cm, start(&["zero"], Strictness::Strict)).0.unwrap();
    tick(&cm, 3);
    assert_eq!(probe.updates(), 4);
    let summary = cm.get_loaded_controllers().remove(0);
    assert_eq!(summary.update_rate, 1);
}

#[test]
fn counter_restarts_on_reactivation() {
    let cm = manager();
    let probe = add_configured(&cm, "slow", &[], 3);
    switch(&cm, start(&["slow"], Strictness::Strict)).0.unwrap();
    tick(&cm, 1); // counter at 2
    switch(&cm, stop(&["slow"], Strictness::Strict)).0.unwrap();
    assert_eq!(probe.updates(), 0);

    switch(&cm, start(&["slow"], Strictness::Strict)).0.unwrap(); // counter 1
    tick(&cm, 1);
    assert_eq!(probe.updates(), 0);
    tick(&cm, 1);
    assert_eq!(probe.updates(), 1);
}
