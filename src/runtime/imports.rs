//! Name-keyed import resolution
//!
//! An [`ImportObject`] maps `(module, name)` pairs to resolved external
//! values. Instantiation itself consumes a positional list of externals;
//! this registry is the convenience layer that produces that list from a
//! module's declared imports.

use super::instance::ExternalValue;
use super::InstantiationError;
use crate::module::Module;
use std::collections::HashMap;

/// Container of resolved externals a module can import from
#[derive(Debug, Clone, Default)]
pub struct ImportObject {
    entries: HashMap<(String, String), ExternalValue>,
}

impl ImportObject {
    pub fn new() -> Self {
        ImportObject::default()
    }

    /// Register an external value under `module.name`, replacing any
    /// previous entry
    pub fn add(&mut self, module: impl Into<String>, name: impl Into<String>, value: ExternalValue) {
        self.entries.insert((module.into(), name.into()), value);
    }

    pub fn get(&self, module: &str, name: &str) -> Option<ExternalValue> {
        self.entries.get(&(module.to_string(), name.to_string())).copied()
    }

    /// Resolve every declared import of `module`, order-matched.
    ///
    /// Only presence is checked here; kind matching is instantiation's
    /// concern so that a positional caller gets the same error either way.
    pub fn resolve(&self, module: &Module) -> Result<Vec<ExternalValue>, InstantiationError> {
        module
            .imports
            .iter()
            .map(|import| {
                self.get(&import.module, &import.name)
                    .ok_or_else(|| InstantiationError::UnknownImport {
                        module: import.module.clone(),
                        name: import.name.clone(),
                    })
            })
            .collect()
    }
}
