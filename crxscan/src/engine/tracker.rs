//! Binding and taint recording during the module walk.
//!
//! Mutates the flat per-module symbol table: declarations, destructuring
//! patterns, reassignments, class members, object/array literals, and
//! call-site parameter binding for immediately-invoked functions.

use super::consteval;
use super::resolve::{self, resolve_expr, static_path_text};
use super::state::ModuleState;
use super::types::{join_segment, TaintValue};
use crate::config::AnalyzerConfig;
use crate::constants::{OPAQUE_ARRAY, OPAQUE_OBJECT};
use swc_ecma_ast::{
    ArrayLit, ArrayPat, AssignExpr, AssignTarget, AssignTargetPat, Class, ClassMember, Expr,
    ExprOrSpread, MemberExpr, MemberProp, MethodKind, ObjectLit, ObjectPat, ObjectPatProp, Pat,
    Prop, PropName, PropOrSpread, SimpleAssignTarget, Stmt, VarDecl,
};

/// The taint value of an initializer/right-hand-side expression.
pub(crate) fn init_value(expr: &Expr, state: &ModuleState, config: &AnalyzerConfig) -> TaintValue {
    resolve_expr(expr, state, config).unwrap_or(TaintValue::Unknown)
}

/// The base value destructuring extracts from. Host-resolved values win;
/// otherwise the initializer's textual path keeps recorded synthetic
/// properties reachable.
fn pattern_base(expr: &Expr, state: &ModuleState, config: &AnalyzerConfig) -> TaintValue {
    let resolved = resolve_expr(expr, state, config);
    if let Some(value) = &resolved {
        if value.is_host() {
            return value.clone();
        }
    }
    if let Some(path) = static_path_text(expr) {
        return TaintValue::Literal(path);
    }
    resolved.unwrap_or(TaintValue::Unknown)
}

/// One step into a resolved base: `base.key` or `base[index]`.
fn child_value(
    base: &TaintValue,
    segment: &str,
    state: &ModuleState,
    config: &AnalyzerConfig,
) -> TaintValue {
    match base {
        value if value.is_host() => value.extend(segment),
        TaintValue::Literal(sym) => {
            let key = join_segment(sym, segment);
            resolve::Resolver::new(state, config)
                .resolve_key(&key)
                .unwrap_or(TaintValue::Literal(key))
        }
        _ => TaintValue::Unknown,
    }
}

/// Records every declarator of a `var`/`let`/`const` statement.
pub(crate) fn handle_var_decl(var: &VarDecl, state: &mut ModuleState, config: &AnalyzerConfig) {
    for declarator in &var.decls {
        match &declarator.name {
            Pat::Ident(binding) => {
                let name = binding.id.sym.as_ref().to_owned();
                let value = match declarator.init.as_deref().map(resolve::strip_parens) {
                    Some(Expr::Object(obj)) => record_object_literal(&name, obj, state, config),
                    Some(Expr::Array(arr)) => record_array_literal(&name, arr, state, config),
                    Some(init) => init_value(init, state, config),
                    None => TaintValue::Unknown,
                };
                state.record(&name, value);
            }
            pattern => {
                let base = declarator
                    .init
                    .as_deref()
                    .map_or(TaintValue::Unknown, |init| {
                        pattern_base(init, state, config)
                    });
                bind_pattern(pattern, &base, state, config);
            }
        }
    }
}

/// Binds every name a pattern extracts, recursing into nested patterns.
pub(crate) fn bind_pattern(
    pat: &Pat,
    base: &TaintValue,
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    match pat {
        Pat::Ident(binding) => state.record(binding.id.sym.as_ref(), base.clone()),
        Pat::Object(obj) => bind_object_pat(obj, base, state, config),
        Pat::Array(arr) => bind_array_pat(arr, base, state, config),
        Pat::Assign(assign) => {
            // Default values kick in when extraction yields nothing.
            let effective = if *base == TaintValue::Unknown {
                init_value(&assign.right, state, config)
            } else {
                base.clone()
            };
            bind_pattern(&assign.left, &effective, state, config);
        }
        Pat::Rest(rest) => {
            bind_pattern(&rest.arg, &TaintValue::Literal(OPAQUE_ARRAY.to_owned()), state, config);
        }
        _ => {}
    }
}

fn bind_object_pat(
    obj: &ObjectPat,
    base: &TaintValue,
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    for prop in &obj.props {
        match prop {
            ObjectPatProp::KeyValue(kv) => {
                let child = match prop_name_text(&kv.key, state) {
                    Some(segment) => child_value(base, &segment, state, config),
                    // Unresolvable computed key on a tainted base stays
                    // reportable rather than vanishing.
                    None if base.is_host() => base.to_dynamic(),
                    None => TaintValue::Unknown,
                };
                bind_pattern(&kv.value, &child, state, config);
            }
            ObjectPatProp::Assign(assign) => {
                let name = assign.key.sym.as_ref().to_owned();
                let mut child = child_value(base, &name, state, config);
                if child == TaintValue::Unknown {
                    if let Some(default) = &assign.value {
                        child = init_value(default, state, config);
                    }
                }
                state.record(&name, child);
            }
            ObjectPatProp::Rest(rest) => {
                bind_pattern(
                    &rest.arg,
                    &TaintValue::Literal(OPAQUE_OBJECT.to_owned()),
                    state,
                    config,
                );
            }
        }
    }
}

fn bind_array_pat(
    arr: &ArrayPat,
    base: &TaintValue,
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    for (index, elem) in arr.elems.iter().enumerate() {
        let Some(pat) = elem else { continue };
        if matches!(pat, Pat::Rest(_)) {
            bind_pattern(pat, base, state, config);
            continue;
        }
        let child = child_value(base, &index.to_string(), state, config);
        bind_pattern(pat, &child, state, config);
    }
}

/// Applies an assignment expression to the table with the monotonic rule.
pub(crate) fn handle_assign(
    assign: &AssignExpr,
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    let value = init_value(&assign.right, state, config);
    match &assign.left {
        AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
            state.record(binding.id.sym.as_ref(), value);
        }
        AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
            if let Some(key) = member_key_text(member, state) {
                state.record(&key, value);
            }
        }
        AssignTarget::Pat(AssignTargetPat::Object(obj)) => {
            let base = pattern_base(&assign.right, state, config);
            bind_object_pat(obj, &base, state, config);
        }
        AssignTarget::Pat(AssignTargetPat::Array(arr)) => {
            let base = pattern_base(&assign.right, state, config);
            bind_array_pat(arr, &base, state, config);
        }
        _ => {}
    }
}

/// The binding key for a member assignment target (`o.a`, `o[0]`).
fn member_key_text(member: &MemberExpr, state: &ModuleState) -> Option<String> {
    let base = static_path_text(&member.obj)?;
    let segment = match &member.prop {
        MemberProp::Ident(ident) => ident.sym.as_ref().to_owned(),
        MemberProp::Computed(computed) => consteval::try_evaluate(&computed.expr, state)?,
        MemberProp::PrivateName(_) => return None,
    };
    Some(join_segment(&base, &segment))
}

/// Flattens class members into synthetic keys: `ClassName.method()` for
/// static methods returning a host API, `ClassName_instance.field` for
/// constructor and property assignments.
pub(crate) fn handle_class(
    name: &str,
    class: &Class,
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    for member in &class.body {
        match member {
            ClassMember::Method(method) if method.is_static => {
                if method.kind != MethodKind::Method {
                    continue;
                }
                let Some(key) = prop_name_text(&method.key, state) else {
                    continue;
                };
                let returned = method
                    .function
                    .body
                    .as_ref()
                    .and_then(|body| consteval::single_return(&body.stmts));
                if let Some(expr) = returned {
                    let value = init_value(expr, state, config);
                    if value.is_host() {
                        state.record(&format!("{name}.{key}()"), value);
                    }
                }
            }
            ClassMember::Constructor(ctor) => {
                let Some(body) = &ctor.body else { continue };
                for stmt in &body.stmts {
                    let Stmt::Expr(expr_stmt) = stmt else { continue };
                    let Expr::Assign(assign) = expr_stmt.expr.as_ref() else {
                        continue;
                    };
                    let AssignTarget::Simple(SimpleAssignTarget::Member(member)) = &assign.left
                    else {
                        continue;
                    };
                    if !matches!(member.obj.as_ref(), Expr::This(_)) {
                        continue;
                    }
                    let MemberProp::Ident(field) = &member.prop else { continue };
                    let value = init_value(&assign.right, state, config);
                    state.record(&format!("{name}_instance.{}", field.sym), value);
                }
            }
            ClassMember::ClassProp(prop) => {
                let Some(key) = prop_name_text(&prop.key, state) else {
                    continue;
                };
                let Some(value_expr) = &prop.value else { continue };
                let value = init_value(value_expr, state, config);
                let synthetic = if prop.is_static {
                    format!("{name}.{key}")
                } else {
                    format!("{name}_instance.{key}")
                };
                state.record(&synthetic, value);
            }
            _ => {}
        }
    }
}

/// Records each property of an object-literal initializer under a per-key
/// synthetic path; returns the literal's own value (a `toString` override
/// constant, or the opaque object marker).
fn record_object_literal(
    name: &str,
    obj: &ObjectLit,
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) -> TaintValue {
    if let Some(folded) = consteval::fold_stringify_override(obj, state) {
        return TaintValue::Literal(folded);
    }
    for prop in &obj.props {
        let PropOrSpread::Prop(prop) = prop else { continue };
        match prop.as_ref() {
            Prop::KeyValue(kv) => {
                let Some(segment) = prop_name_text(&kv.key, state) else {
                    continue;
                };
                let key = join_segment(name, &segment);
                match resolve::strip_parens(&kv.value) {
                    Expr::Object(nested) => {
                        let value = record_object_literal(&key, nested, state, config);
                        state.record(&key, value);
                    }
                    Expr::Array(nested) => {
                        let value = record_array_literal(&key, nested, state, config);
                        state.record(&key, value);
                    }
                    value_expr => {
                        let value = init_value(value_expr, state, config);
                        if value != TaintValue::Unknown {
                            state.record(&key, value);
                        }
                    }
                }
            }
            Prop::Shorthand(ident) => {
                let value = init_value(&Expr::Ident(ident.clone()), state, config);
                if value != TaintValue::Unknown {
                    let key = join_segment(name, ident.sym.as_ref());
                    state.record(&key, value);
                }
            }
            _ => {}
        }
    }
    TaintValue::Literal(OPAQUE_OBJECT.to_owned())
}

/// Records host-resolvable array elements under per-index synthetic paths.
fn record_array_literal(
    name: &str,
    arr: &ArrayLit,
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) -> TaintValue {
    for (index, elem) in arr.elems.iter().enumerate() {
        let Some(ExprOrSpread { spread: None, expr }) = elem else {
            continue;
        };
        let value = init_value(expr, state, config);
        if value != TaintValue::Unknown {
            state.record(&format!("{name}[{index}]"), value);
        }
    }
    TaintValue::Literal(OPAQUE_ARRAY.to_owned())
}

/// Binds the parameters of an immediately-invoked function to the resolved
/// taint of the call-site arguments, and records `arguments[i]` bindings
/// regardless of the named-parameter count.
pub(crate) fn bind_iife_params(
    callee: &Expr,
    args: &[ExprOrSpread],
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    let params: Vec<&Pat> = match resolve::strip_parens(callee) {
        Expr::Arrow(arrow) => arrow.params.iter().collect(),
        Expr::Fn(fn_expr) => fn_expr.function.params.iter().map(|p| &p.pat).collect(),
        _ => return,
    };

    for (index, pat) in params.iter().enumerate() {
        let value = args
            .get(index)
            .map_or(TaintValue::Unknown, |arg| init_value(&arg.expr, state, config));
        bind_pattern(pat, &value, state, config);
    }
    for (index, arg) in args.iter().enumerate() {
        let value = init_value(&arg.expr, state, config);
        state.record(&format!("arguments[{index}]"), value);
    }
}

/// The literal text of a property name, folding computed keys.
pub(crate) fn prop_name_text(name: &PropName, state: &ModuleState) -> Option<String> {
    match name {
        PropName::Ident(ident) => Some(ident.sym.as_ref().to_owned()),
        PropName::Str(s) => Some(s.value.as_ref().to_owned()),
        PropName::Num(n) => Some(if n.value.fract() == 0.0 {
            format!("{}", n.value as i64)
        } else {
            format!("{}", n.value)
        }),
        PropName::Computed(computed) => consteval::try_evaluate(&computed.expr, state),
        PropName::BigInt(_) => None,
    }
}
