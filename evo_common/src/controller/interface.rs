//! Interface configuration declared by a controller.
//!
//! A controller tells the manager which command interfaces it must own and
//! which state interfaces it reads. `All` is resolved against whatever the
//! hardware layer exports at the time of resolution.

use serde::{Deserialize, Serialize};

/// Wildcard accepted in configuration files for [`InterfaceConfigurationType::All`].
pub const ALL_INTERFACES_WILDCARD: &str = "*";

/// Kind of interface requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum InterfaceConfigurationType {
    /// Every interface exported by the hardware layer.
    All = 0,
    /// The explicit list in [`InterfaceConfiguration::names`].
    Individual = 1,
    /// No interfaces.
    #[default]
    None = 2,
}

/// Interface requirement of one controller (commands or states).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InterfaceConfiguration {
    /// Requirement kind.
    #[serde(rename = "type")]
    pub kind: InterfaceConfigurationType,
    /// Interface names, only meaningful for `Individual`.
    #[serde(default)]
    pub names: Vec<String>,
}

impl InterfaceConfiguration {
    /// No interfaces required.
    pub const fn none() -> Self {
        Self {
            kind: InterfaceConfigurationType::None,
            names: Vec::new(),
        }
    }

    /// Every interface the hardware layer exports.
    pub const fn all() -> Self {
        Self {
            kind: InterfaceConfigurationType::All,
            names: Vec::new(),
        }
    }

    /// An explicit list of interface names.
    pub fn individual<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: InterfaceConfigurationType::Individual,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from a configuration-file list.
    ///
    /// `None` or an empty list → `None`; `["*"]` → `All`; anything else → `Individual`.
    pub fn from_config_list(list: Option<&[String]>) -> Self {
        match list {
            None | Some([]) => Self::none(),
            Some([only]) if only == ALL_INTERFACES_WILDCARD => Self::all(),
            Some(names) => Self::individual(names.iter().cloned()),
        }
    }

    /// Resolve to concrete interface names.
    ///
    /// `available` is the hardware layer's export list; it is only consulted
    /// for `All`. Duplicate names in an `Individual` list are collapsed while
    /// keeping first-seen order.
    pub fn resolve(&self, available: &[String]) -> Vec<String> {
        match self.kind {
            InterfaceConfigurationType::None => Vec::new(),
            InterfaceConfigurationType::All => available.to_vec(),
            InterfaceConfigurationType::Individual => {
                let mut out: Vec<String> = Vec::with_capacity(self.names.len());
                for name in &self.names {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
                out
            }
        }
    }
}
