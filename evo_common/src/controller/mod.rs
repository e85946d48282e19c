//! Controller-manager shared types.
//!
//! Everything a controller implementation, a transport layer or the manager
//! itself needs to agree on: lifecycle states, switch strictness, the cycle
//! status enum, interface configuration and error kinds.

pub mod error;
pub mod interface;
pub mod state;

pub use error::{ClaimConflict, ControllerError, Hook, HookError};
pub use interface::{InterfaceConfiguration, InterfaceConfigurationType};
pub use state::{ControllerState, ReturnType, Strictness};
