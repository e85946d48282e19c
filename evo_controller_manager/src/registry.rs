//! Interface claim registry.
//!
//! Two separate maps:
//! - command interface → owning controller (exclusive, at most one owner)
//! - state interface → set of reading controllers (shared, no conflicts)
//!
//! Exclusivity is enforced only in [`ClaimRegistry::try_claim`]; an existing
//! owner is never overwritten. A failed claim leaves the registry untouched.

use std::collections::{BTreeSet, HashMap};

use evo_common::controller::ClaimConflict;

/// Ownership of hardware interfaces by loaded controllers.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    command_owners: HashMap<String, String>,
    state_readers: HashMap<String, BTreeSet<String>>,
}

impl ClaimRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `command` interfaces exclusively and subscribe to `state`
    /// interfaces for `controller`.
    ///
    /// Re-claiming an interface the controller already owns is not a conflict.
    ///
    /// # Errors
    /// Every command interface owned by another controller, with its owner.
    /// Nothing is recorded in that case.
    pub fn try_claim(
        &mut self,
        controller: &str,
        command: &[String],
        state: &[String],
    ) -> Result<(), Vec<ClaimConflict>> {
        let conflicts: Vec<ClaimConflict> = command
            .iter()
            .filter_map(|iface| match self.command_owners.get(iface) {
                Some(owner) if owner != controller => Some(ClaimConflict {
                    interface: iface.clone(),
                    owner: owner.clone(),
                    requested_by: controller.to_string(),
                }),
                _ => None,
            })
            .collect();

        if !conflicts.is_empty() {
            return Err(conflicts);
        }

        for iface in command {
            self.command_owners
                .insert(iface.clone(), controller.to_string());
        }
        for iface in state {
            self.state_readers
                .entry(iface.clone())
                .or_default()
                .insert(controller.to_string());
        }
        Ok(())
    }

    /// Drop every command claim and state subscription held by `controller`.
    ///
    /// Idempotent. Returns the number of command interfaces released.
    pub fn release(&mut self, controller: &str) -> usize {
        let before = self.command_owners.len();
        self.command_owners.retain(|_, owner| owner != controller);
        let released = before - self.command_owners.len();

        self.state_readers.retain(|_, readers| {
            readers.remove(controller);
            !readers.is_empty()
        });
        released
    }

    /// Current owner of a command interface.
    pub fn owner(&self, interface: &str) -> Option<&str> {
        self.command_owners.get(interface).map(String::as_str)
    }

    /// True if some controller owns the command interface.
    #[inline]
    pub fn is_claimed(&self, interface: &str) -> bool {
        self.command_owners.contains_key(interface)
    }

    /// Controllers currently reading a state interface, sorted by name.
    pub fn readers(&self, interface: &str) -> Vec<String> {
        self.state_readers
            .get(interface)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Command interfaces owned by `controller`, sorted.
    pub fn claimed_by(&self, controller: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .command_owners
            .iter()
            .filter(|(_, owner)| owner.as_str() == controller)
            .map(|(iface, _)| iface.clone())
            .collect();
        out.sort();
        out
    }

    /// Number of claimed command interfaces.
    #[inline]
    pub fn claimed_count(&self) -> usize {
        self.command_owners.len()
    }
}
