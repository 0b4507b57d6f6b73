//! Per-module mutable analysis state.
//!
//! One flat table per module, not per lexical block: the analysis is
//! deliberately flow-insensitive, trading precision for coverage of
//! conditionally-assigned and hoisted bindings. The state is created for a
//! single module walk and discarded once its findings are merged.

use super::types::{TaintValue, ValueSet};
use rustc_hash::{FxHashMap, FxHashSet};

/// Symbol table, Map-content tracking, and finding accumulator for one
/// module. Shared by the tracker, the expression resolver, and the call
/// classifier for the duration of the walk.
#[derive(Debug, Default)]
pub struct ModuleState {
    /// Binding key (identifier or synthetic path) to possible values.
    pub bindings: FxHashMap<String, ValueSet>,
    /// Host-API values known to be stored in a `Map`/`WeakMap` instance,
    /// keyed by the map's binding name.
    pub map_contents: FxHashMap<String, ValueSet>,
    /// Raw findings for this module; canonicalized and sorted later.
    pub findings: FxHashSet<String>,
}

impl ModuleState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one possible value for a binding.
    ///
    /// Taint is monotonic: once the existing set carries host-API taint,
    /// new assignments union into it rather than replacing it, so a
    /// conditionally-tainted variable keeps every candidate.
    pub fn record(&mut self, key: &str, value: TaintValue) {
        let set = self.bindings.entry(key.to_owned()).or_default();
        if set.iter().any(TaintValue::is_host) {
            if !set.contains(&value) {
                set.push(value);
            }
        } else {
            set.clear();
            set.push(value);
        }
    }

    /// Records several possible values at once, with the same union rule.
    pub fn record_set(&mut self, key: &str, values: ValueSet) {
        for value in values {
            self.record(key, value);
        }
    }

    /// All recorded values for a binding key.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&ValueSet> {
        self.bindings.get(key)
    }

    /// The preferred single value for a binding: the first host-tainted
    /// value if any, otherwise the first recorded one.
    #[must_use]
    pub fn preferred(&self, key: &str) -> Option<&TaintValue> {
        let set = self.bindings.get(key)?;
        set.iter().find(|v| v.is_host()).or_else(|| set.first())
    }

    /// A binding's value when it holds exactly one known constant.
    #[must_use]
    pub fn single_literal(&self, key: &str) -> Option<&str> {
        let set = self.bindings.get(key)?;
        match set.as_slice() {
            [TaintValue::Literal(s)] => Some(s),
            _ => None,
        }
    }

    /// Best-effort `this.field` resolution: the first host-tainted value
    /// recorded under any `ClassName_instance.field` key in this module.
    #[must_use]
    pub fn instance_field(&self, field: &str) -> Option<&TaintValue> {
        let suffix = format!("_instance.{field}");
        self.bindings
            .iter()
            .filter(|(key, _)| key.ends_with(&suffix))
            .flat_map(|(_, set)| set.iter())
            .find(|v| v.is_host())
    }

    /// Marks a map instance as containing a host-API value.
    pub fn mark_map_contains(&mut self, map: &str, value: TaintValue) {
        let set = self.map_contents.entry(map.to_owned()).or_default();
        if !set.contains(&value) {
            set.push(value);
        }
    }

    /// Host-API values known to be stored in a map instance.
    #[must_use]
    pub fn map_values(&self, map: &str) -> Option<&ValueSet> {
        self.map_contents.get(map)
    }

    /// Records one detected host-API use.
    pub fn add_finding(&mut self, path: impl Into<String>) {
        self.findings.insert(path.into());
    }
}
