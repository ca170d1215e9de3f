//! Per-compilation render state.
//!
//! `RenderEnv` is the single source of truth for names during rendering: it
//! maps each distinct variable identity to a generated textual name and
//! holds the compilation's parameter map. One environment is created per
//! top-level compile call and never shared across calls, so concurrent
//! compilations need no locking.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::expr::{Param, Variable};

#[derive(Debug, Default)]
pub struct RenderEnv {
    variable_names: HashMap<u64, String>,
    base_counters: HashMap<String, usize>,
    parameter_names: HashMap<u64, String>,
    parameters: Map<String, Value>,
}

impl RenderEnv {
    pub fn new() -> Self {
        RenderEnv::default()
    }

    /// Deterministic name for a variable identity: first encounter assigns
    /// `{base}{n}` with a per-base counter, later encounters reuse the
    /// stored name. Distinct identities never share a name.
    pub fn name_of(&mut self, variable: &Variable) -> String {
        if let Some(name) = self.variable_names.get(&variable.handle()) {
            return name.clone();
        }
        let counter = self
            .base_counters
            .entry(variable.base().to_string())
            .or_insert(0);
        let name = format!("{}{}", variable.base(), *counter);
        *counter += 1;
        log::trace!("RenderEnv: variable #{} -> {}", variable.handle(), name);
        self.variable_names.insert(variable.handle(), name.clone());
        name
    }

    /// Name for a parameter placeholder. The first render allocates the
    /// next `param{n}` suffix and records `(name, value)` into the ordered
    /// parameter map; repeated renders of the same placeholder reuse the
    /// assigned name.
    pub fn parameter_for(&mut self, param: &Param) -> String {
        if let Some(name) = self.parameter_names.get(&param.handle()) {
            return name.clone();
        }
        let name = format!("param{}", self.parameters.len());
        self.parameters.insert(name.clone(), param.value().clone());
        self.parameter_names.insert(param.handle(), name.clone());
        name
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Names of parameters allocated at or after the given count marker,
    /// in allocation order. Used when an embedded sub-statement needs to
    /// forward its parameters through an argument map.
    pub fn parameter_names_from(&self, marker: usize) -> Vec<String> {
        (marker..self.parameters.len())
            .map(|i| format!("param{}", i))
            .collect()
    }

    pub fn into_parameters(self) -> Map<String, Value> {
        self.parameters
    }
}
