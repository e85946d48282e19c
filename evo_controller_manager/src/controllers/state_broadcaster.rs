//! State broadcaster.
//!
//! Registered as `state_broadcaster`. Reads state interfaces and counts the
//! snapshots it has published.

use std::time::Duration;

use evo_common::controller::{InterfaceConfiguration, InterfaceConfigurationType, ReturnType};
use tracing::debug;

use crate::controller::{ControllerInterface, ControllerParams, HookResult, LoanedInterfaces};

/// Read-only controller subscribing to state interfaces.
///
/// Declares ALL state interfaces unless the config narrows them down. Never
/// claims a command interface, so any number of broadcasters can be active.
#[derive(Debug)]
pub struct StateBroadcaster {
    state_interfaces: InterfaceConfiguration,
    update_rate: u32,
    subscribed: Vec<String>,
    published: u64,
}

impl StateBroadcaster {
    /// Loader type name.
    pub const TYPE_NAME: &'static str = "state_broadcaster";

    /// Factory used by the loader.
    pub fn create(params: &ControllerParams) -> Box<dyn ControllerInterface> {
        Box::new(Self::new(params))
    }

    fn new(params: &ControllerParams) -> Self {
        let state_interfaces = match params.state_interfaces.kind {
            InterfaceConfigurationType::None => InterfaceConfiguration::all(),
            _ => params.state_interfaces.clone(),
        };
        Self {
            state_interfaces,
            update_rate: params.update_rate,
            subscribed: Vec::new(),
            published: 0,
        }
    }

    /// Number of completed broadcasts since activation.
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl ControllerInterface for StateBroadcaster {
    fn command_interface_configuration(&self) -> InterfaceConfiguration {
        InterfaceConfiguration::none()
    }

    fn state_interface_configuration(&self) -> InterfaceConfiguration {
        self.state_interfaces.clone()
    }

    fn update_rate(&self) -> u32 {
        self.update_rate
    }

    fn on_activate(&mut self, interfaces: &LoanedInterfaces) -> HookResult {
        self.subscribed = interfaces.state.clone();
        self.published = 0;
        debug!(interfaces = self.subscribed.len(), "state broadcaster subscribed");
        Ok(())
    }

    fn on_deactivate(&mut self) -> HookResult {
        self.subscribed.clear();
        Ok(())
    }

    fn update(&mut self, _time: Duration, _period: Duration) -> ReturnType {
        self.published += 1;
        ReturnType::Ok
    }
}
