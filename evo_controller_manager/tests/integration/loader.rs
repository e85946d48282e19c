//! Loading built-in controller types by name.

use evo_common::controller::{ControllerError, ControllerState, InterfaceConfiguration, Strictness};
use evo_controller_manager::{ControllerParams, InterfaceKind};

use super::common::*;

#[test]
fn builtin_types_are_listed() {
    let cm = manager();
    assert_eq!(
        cm.list_controller_types(),
        vec![
            "forward_command_controller".to_string(),
            "state_broadcaster".to_string()
        ]
    );
}

#[test]
fn load_configure_and_run_builtins() {
    let cm = manager();
    let forward = ControllerParams {
        command_interfaces: InterfaceConfiguration::individual(["joint1/position"]),
        update_rate: 2,
        ..ControllerParams::default()
    };
    cm.load_controller("position", "forward_command_controller", &forward)
        .unwrap();
    cm.load_controller("broadcaster", "state_broadcaster", &ControllerParams::default())
        .unwrap();
    cm.configure_controller("position").unwrap();
    cm.configure_controller("broadcaster").unwrap();

    let (result, _) = switch(&cm, start(&["broadcaster", "position"], Strictness::Strict));
    assert_eq!(result, Ok(()));
    assert_eq!(active_count(&cm), 2);

    let loaded = cm.get_loaded_controllers();
    assert_eq!(loaded[0].type_name, "forward_command_controller");
    assert_eq!(loaded[0].update_rate, 2);
    assert_eq!(loaded[0].claimed_interfaces, vec!["joint1/position".to_string()]);
    assert!(loaded[1].claimed_interfaces.is_empty());

    // The broadcaster reads every state interface.
    let states: Vec<_> = cm
        .list_hardware_interfaces()
        .into_iter()
        .filter(|i| i.kind == InterfaceKind::State)
        .collect();
    assert_eq!(states.len(), 4);
    assert!(states.iter().all(|i| i.readers == vec!["broadcaster".to_string()]));
}

#[test]
fn forward_command_without_interfaces_fails_configure() {
    let cm = manager();
    cm.load_controller("empty", "forward_command_controller", &ControllerParams::default())
        .unwrap();
    let err = cm.configure_controller("empty").unwrap_err();
    assert!(matches!(err, ControllerError::HookFailure { .. }));
    assert_eq!(state_of(&cm, "empty"), Some(ControllerState::Unconfigured));
}

#[test]
fn unknown_type_and_duplicate_name() {
    let cm = manager();
    assert_eq!(
        cm.load_controller("x", "joint_trajectory_controller", &ControllerParams::default()),
        Err(ControllerError::UnknownType("joint_trajectory_controller".into()))
    );
    cm.load_controller("x", "state_broadcaster", &ControllerParams::default())
        .unwrap();
    assert_eq!(
        cm.load_controller("x", "state_broadcaster", &ControllerParams::default()),
        Err(ControllerError::DuplicateController("x".into()))
    );
}
