//! Call-site classification.
//!
//! Inspects every call expression encountered during the walk and records
//! findings according to pattern-specific rules. Rule order matters: promise
//! combinator names must be excluded before generic callee resolution, or a
//! `.then` chain over an API result would be misreported as an API call of
//! its own.

use super::consteval;
use super::resolve::{ident_is, ident_prop, resolve_expr, static_path_text, strip_parens};
use super::state::ModuleState;
use crate::config::AnalyzerConfig;
use crate::constants::{self, DYNAMIC_EXEC_FINDING, DYNAMIC_MARKER};
use swc_ecma_ast::{CallExpr, Callee, Expr, ExprOrSpread, NewExpr};

/// Classifies one call expression, recording zero or more findings.
pub(crate) fn classify_call(call: &CallExpr, state: &mut ModuleState, config: &AnalyzerConfig) {
    if let Callee::Expr(callee) = &call.callee {
        classify_call_like(callee, &call.args, state, config);
    }
}

/// Classifies a `new` expression; only dynamic code execution
/// (`new Function(...)`) is a finding in itself.
pub(crate) fn classify_new(new_expr: &NewExpr, state: &mut ModuleState, config: &AnalyzerConfig) {
    if is_dynamic_exec(&new_expr.callee, state) {
        state.add_finding(DYNAMIC_EXEC_FINDING);
        if let Some(args) = &new_expr.args {
            record_longest_host_arg(args, state, config);
        }
    }
}

/// Shared classification for plain and optional-chain calls.
pub(crate) fn classify_call_like(
    callee: &Expr,
    args: &[ExprOrSpread],
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    let callee = strip_parens(callee);
    // Promise combinator names are never API calls themselves; checked
    // before generic resolution below.
    let mut excluded = false;
    // Set when a non-finding rule (Map tracking) already explains the call.
    let mut handled = false;

    if let Expr::Member(member) = callee {
        let prop = ident_prop(&member.prop);
        let obj = strip_parens(&member.obj);

        // Rule 1: Reflect.get / Reflect.apply against a resolved target.
        if ident_is(obj, "Reflect") && matches!(prop, Some("get" | "apply")) {
            let target = args
                .first()
                .and_then(|arg| resolve_expr(&arg.expr, state, config));
            if let Some(target) = target {
                if target.is_host() {
                    let finding = if prop == Some("get") {
                        let segment = args
                            .get(1)
                            .and_then(|arg| consteval::try_evaluate(&arg.expr, state))
                            .unwrap_or_else(|| DYNAMIC_MARKER.to_owned());
                        target.extend(&segment)
                    } else {
                        target
                    };
                    if let Some(path) = finding.path() {
                        state.add_finding(path);
                    }
                    return;
                }
            }
        }

        // Rule 2: Object enumeration/copying of a tainted object.
        if ident_is(obj, "Object") {
            if let Some(name) = prop {
                if constants::object_inspectors().contains(name) {
                    let mut hit = false;
                    for arg in args {
                        if let Some(value) = resolve_expr(&arg.expr, state, config) {
                            if value.is_host() {
                                if let Some(path) = value.to_dynamic().path() {
                                    state.add_finding(path);
                                    hit = true;
                                }
                            }
                        }
                    }
                    if hit {
                        return;
                    }
                }
            }
        }

        // Rule 3: Map/WeakMap.set stores a host-API value for later `.get`
        // resolution. Not a finding by itself, and the walk continues so a
        // host `.set` member (chrome.storage.local.set) still classifies.
        if prop == Some("set") {
            if let (Some(map_name), Some(value_arg)) = (static_path_text(&member.obj), args.get(1))
            {
                if let Some(value) = resolve_expr(&value_arg.expr, state, config) {
                    if value.is_host() {
                        state.mark_map_contains(&map_name, value);
                        handled = true;
                    }
                }
            }
        }

        // Rule 4: `.call`/`.apply`/`.bind` unwrap to the underlying callee.
        if let Some(name) = prop {
            if constants::call_unwrappers().contains(name) {
                if let Some(value) = resolve_expr(&member.obj, state, config) {
                    if value.is_host() {
                        if let Some(path) = value.path() {
                            state.add_finding(path);
                        }
                        return;
                    }
                }
            }

            // Rule 5: promise combinators, with the Promise.resolve/reject
            // exception.
            if constants::promise_combinators().contains(name) {
                excluded = true;
            }
            if ident_is(obj, "Promise") && matches!(name, "resolve" | "reject") {
                let mut hit = false;
                for arg in args {
                    if let Some(value) = resolve_expr(&arg.expr, state, config) {
                        if value.is_host() {
                            if let Some(path) = value.to_dynamic().path() {
                                state.add_finding(path);
                                hit = true;
                            }
                        }
                    }
                }
                if hit {
                    return;
                }
                excluded = true;
            }
        }
    }

    if !excluded {
        // Rule 6: dynamic code execution, direct or via a tracked alias.
        if is_dynamic_exec(callee, state) {
            state.add_finding(DYNAMIC_EXEC_FINDING);
            record_longest_host_arg(args, state, config);
            return;
        }

        // Rule 8: a multi-valued callee base fans out one finding per
        // possible value, joined with the method name.
        if let Expr::Member(member) = callee {
            if let Expr::Ident(base) = strip_parens(&member.obj) {
                if let Some(method) = ident_prop(&member.prop) {
                    let fanned: Vec<String> = state
                        .lookup(base.sym.as_ref())
                        .map(|set| {
                            set.iter()
                                .filter(|v| v.is_host())
                                .filter_map(|v| v.extend(method).path().map(str::to_owned))
                                .collect()
                        })
                        .unwrap_or_default();
                    if fanned.len() > 1 {
                        for path in fanned {
                            state.add_finding(path);
                        }
                        return;
                    }
                }
            }
        }

        // Rule 7: direct resolution of the callee.
        if let Some(value) = resolve_expr(callee, state, config) {
            if value.is_host() {
                if let Some(path) = value.path() {
                    state.add_finding(path);
                }
                return;
            }
        }
    }

    // Rule 9: a host-API value passed into an unresolved callee might be
    // invoked there; report it with the dynamic marker rather than dropping.
    // Inline function callees are exempt: their bodies are walked with the
    // arguments bound, so the real call sites inside them classify directly.
    if handled || matches!(callee, Expr::Fn(_) | Expr::Arrow(_)) {
        return;
    }
    for arg in args {
        if let Some(value) = resolve_expr(&arg.expr, state, config) {
            if value.is_host() {
                if let Some(path) = value.to_dynamic().path() {
                    state.add_finding(path);
                }
            }
        }
    }
}

/// Whether a callee is `eval`/`Function`, a tracked alias of either, or a
/// `new Function(...)` result.
fn is_dynamic_exec(callee: &Expr, state: &ModuleState) -> bool {
    match strip_parens(callee) {
        Expr::Ident(ident) => {
            let name = ident.sym.as_ref();
            if name == "eval" || name == "Function" {
                return true;
            }
            state.lookup(name).is_some_and(|set| {
                set.iter()
                    .any(|v| matches!(v.literal(), Some("eval" | "Function")))
            })
        }
        Expr::New(new_expr) => is_dynamic_exec(&new_expr.callee, state),
        _ => false,
    }
}

/// Records the most specific (longest) host-API path among the arguments of
/// a dynamic-execution call, suffixed with the dynamic marker.
fn record_longest_host_arg(
    args: &[ExprOrSpread],
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    let longest = args
        .iter()
        .filter_map(|arg| resolve_expr(&arg.expr, state, config))
        .filter(|value| value.is_host())
        .max_by_key(|value| value.path().map_or(0, str::len));
    if let Some(value) = longest {
        if let Some(path) = value.to_dynamic().path() {
            state.add_finding(path);
        }
    }
}
