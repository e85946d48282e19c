//! Forward command controller.
//!
//! Registered as `forward_command_controller`. Claims an explicit list of
//! command interfaces and writes its held command values to them every due
//! cycle.

use std::time::Duration;

use evo_common::controller::{
    HookError, InterfaceConfiguration, InterfaceConfigurationType, ReturnType,
};
use tracing::trace;

use crate::controller::{ControllerInterface, ControllerParams, HookResult, LoanedInterfaces};

/// Holds one command value per claimed interface and forwards it every cycle.
///
/// `extra.initial` (float) seeds every command; default 0.0.
#[derive(Debug)]
pub struct ForwardCommandController {
    command_interfaces: InterfaceConfiguration,
    update_rate: u32,
    initial: f64,
    commands: Vec<f64>,
}

impl ForwardCommandController {
    /// Loader type name.
    pub const TYPE_NAME: &'static str = "forward_command_controller";

    /// Factory used by the loader.
    pub fn create(params: &ControllerParams) -> Box<dyn ControllerInterface> {
        let initial = params
            .extra
            .get("initial")
            .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
            .unwrap_or(0.0);
        Box::new(Self {
            command_interfaces: params.command_interfaces.clone(),
            update_rate: params.update_rate,
            initial,
            commands: Vec::new(),
        })
    }

    /// Current command buffer.
    pub fn commands(&self) -> &[f64] {
        &self.commands
    }
}

impl ControllerInterface for ForwardCommandController {
    fn command_interface_configuration(&self) -> InterfaceConfiguration {
        self.command_interfaces.clone()
    }

    fn state_interface_configuration(&self) -> InterfaceConfiguration {
        InterfaceConfiguration::none()
    }

    fn update_rate(&self) -> u32 {
        self.update_rate
    }

    fn on_configure(&mut self) -> HookResult {
        match self.command_interfaces.kind {
            InterfaceConfigurationType::Individual if !self.command_interfaces.names.is_empty() => {
                Ok(())
            }
            _ => Err(HookError::new(
                "forward_command_controller needs an explicit, non-empty command interface list",
            )),
        }
    }

    fn on_activate(&mut self, interfaces: &LoanedInterfaces) -> HookResult {
        self.commands = vec![self.initial; interfaces.command.len()];
        Ok(())
    }

    fn on_deactivate(&mut self) -> HookResult {
        self.commands.clear();
        Ok(())
    }

    fn update(&mut self, _time: Duration, period: Duration) -> ReturnType {
        trace!(
            commands = self.commands.len(),
            period_us = period.as_micros() as u64,
            "forwarding commands"
        );
        ReturnType::Ok
    }
}
