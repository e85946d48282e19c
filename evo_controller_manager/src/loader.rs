//! Controller type registry.
//!
//! Maps a type identifier to a factory function. Built at startup, populated
//! via `register()`, and handed to the manager by value. No global state.

use std::collections::HashMap;

use evo_common::controller::ControllerError;

use crate::controller::{ControllerInterface, ControllerParams};
use crate::controllers::{ForwardCommandController, StateBroadcaster};

/// Factory building a fresh controller instance from its parameters.
pub type ControllerFactory = fn(&ControllerParams) -> Box<dyn ControllerInterface>;

/// Registry of loadable controller types.
pub struct ControllerLoader {
    factories: HashMap<&'static str, ControllerFactory>,
}

impl ControllerLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Loader with every built-in controller type registered.
    pub fn with_builtin() -> Self {
        let mut loader = Self::new();
        loader.register(ForwardCommandController::TYPE_NAME, ForwardCommandController::create);
        loader.register(StateBroadcaster::TYPE_NAME, StateBroadcaster::create);
        loader
    }

    /// Register a factory.
    ///
    /// # Panics
    /// Panics if a factory with the same type name is already registered.
    pub fn register(&mut self, type_name: &'static str, factory: ControllerFactory) {
        if self.factories.contains_key(type_name) {
            panic!("Controller type '{type_name}' is already registered");
        }
        self.factories.insert(type_name, factory);
    }

    /// True if `type_name` can be instantiated.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Instantiate a controller of `type_name`.
    ///
    /// # Errors
    /// `ControllerError::UnknownType` if nothing is registered under that name.
    pub fn create(
        &self,
        type_name: &str,
        params: &ControllerParams,
    ) -> Result<Box<dyn ControllerInterface>, ControllerError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| ControllerError::UnknownType(type_name.to_string()))?;
        Ok(factory(params))
    }

    /// Registered type names, sorted.
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().map(|t| t.to_string()).collect();
        types.sort();
        types
    }
}

impl Default for ControllerLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ControllerLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerLoader")
            .field("types", &self.list_types())
            .finish()
    }
}
