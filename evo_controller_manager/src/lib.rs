//! # EVO Controller Manager
//!
//! Admits, configures, activates, deactivates and unloads controllers over a
//! shared pool of named hardware interfaces, with every transition applied
//! between update cycles.
//!
//! # Module Structure
//!
//! - [`registry`] - exclusive command claims, shared state readers
//! - [`lifecycle`] - controller state transition table
//! - [`controller`] - controller trait and per-controller record
//! - [`planner`] - switch request validation (STRICT / BEST_EFFORT)
//! - [`pending`] - single-entry request slots with completion handles
//! - [`manager`] - loaded set, admin entry points, update-loop synchronizer
//! - [`loader`] - controller type factories
//! - [`controllers`] - built-in controller types
//! - [`config`] - TOML configuration
//! - [`cycle`] - periodic loop runner and RT setup
//!
//! # Architecture
//!
//! ```text
//!  admin threads                           loop thread
//!  ─────────────                           ───────────
//!  switch_controller ─┐                    update(time, period)
//!     plan_switch     │  ┌──────────────┐     │
//!     submit ─────────┼─►│ PendingSlot  │◄────┤ take + apply
//!     wait ◄──────────┼──│ + Completion │─────┤ fulfill
//!  unload_controller ─┘  └──────────────┘     │
//!                                             ▼
//!  add / configure ──► Mutex<ManagerState> ◄── tick Active controllers
//!                      (records + ClaimRegistry)
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod controllers;
pub mod cycle;
pub mod lifecycle;
pub mod loader;
pub mod manager;
pub mod pending;
pub mod planner;
pub mod registry;

pub use crate::config::ManagerConfig;
pub use crate::controller::{
    ControllerInterface, ControllerParams, ControllerSummary, HookResult, LoanedInterfaces,
};
pub use crate::cycle::{CycleRunner, CycleStats};
pub use crate::loader::{ControllerFactory, ControllerLoader};
pub use crate::manager::{ControllerManager, InterfaceKind, InterfaceSummary};
pub use crate::planner::{SwitchPlan, SwitchRequest};
pub use crate::registry::ClaimRegistry;
