//! Name sets and markers shared across the engine.

use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Path segment standing in for a property that could not be resolved.
pub const DYNAMIC_MARKER: &str = "Dynamic";

/// Finding recorded for `eval`/`Function`-style dynamic code execution.
pub const DYNAMIC_EXEC_FINDING: &str = "DYNAMIC";

/// Opaque value recorded for an object literal with no resolvable content.
pub const OPAQUE_OBJECT: &str = "Object";

/// Opaque value recorded for array literals and rest elements.
pub const OPAQUE_ARRAY: &str = "Array";

/// Resolution depth bound for adversarially nested expressions.
pub const MAX_RESOLVE_DEPTH: usize = 128;

/// Returns promise combinator method names that must never be reported as
/// API calls themselves.
pub fn promise_combinators() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut set = FxHashSet::default();
        for name in ["then", "catch", "finally", "all", "race", "allSettled", "any"] {
            set.insert(name);
        }
        set
    })
}

/// Returns promise chaining method names whose result carries the value of
/// the underlying promise expression.
pub fn promise_chain_methods() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut set = FxHashSet::default();
        for name in ["then", "catch", "finally"] {
            set.insert(name);
        }
        set
    })
}

/// Returns `Object` static methods that enumerate or copy a target object.
pub fn object_inspectors() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut set = FxHashSet::default();
        for name in [
            "assign",
            "keys",
            "entries",
            "values",
            "getOwnPropertyDescriptor",
        ] {
            set.insert(name);
        }
        set
    })
}

/// Returns function-object methods that indirect the underlying callee.
pub fn call_unwrappers() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut set = FxHashSet::default();
        for name in ["call", "apply", "bind"] {
            set.insert(name);
        }
        set
    })
}
