//! EVO Common Library
//!
//! Shared types and configuration loading for the EVO controller manager
//! workspace.
//!
//! # Module Structure
//!
//! - [`controller`] - Lifecycle states, strictness, interface configuration, errors
//! - [`hardware`] - Hardware-layer interface enumeration
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide defaults and limits
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! evo = { package = "evo_common", path = "../evo_common" }
//! ```
//!
//! ```rust
//! use evo_common::controller::{ControllerState, Strictness};
//! use evo_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod controller;
pub mod hardware;
pub mod prelude;
