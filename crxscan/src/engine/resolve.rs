//! Recursive resolution of arbitrary expressions to host-API paths.
//!
//! `resolve` answers, for any AST expression, "which privileged path could
//! this evaluate to?" It must never panic on an unrecognized node kind;
//! `None` means "no information", which callers distinguish from an explicit
//! [`TaintValue::Dynamic`] result.

use super::consteval;
use super::state::ModuleState;
use super::types::{join_path, join_segment, TaintValue};
use crate::config::AnalyzerConfig;
use crate::constants::{self, DYNAMIC_MARKER, MAX_RESOLVE_DEPTH};
use std::cell::Cell;
use swc_ecma_ast::{
    BinaryOp, BlockStmtOrExpr, CallExpr, Callee, Expr, ExprOrSpread, MemberExpr, MemberProp,
    NewExpr, OptChainBase,
};

/// Resolves an expression against the module's recorded bindings.
#[must_use]
pub fn resolve_expr(
    expr: &Expr,
    state: &ModuleState,
    config: &AnalyzerConfig,
) -> Option<TaintValue> {
    Resolver::new(state, config).resolve(expr)
}

/// Expression resolver borrowing the shared per-module symbol table.
pub struct Resolver<'a> {
    state: &'a ModuleState,
    config: &'a AnalyzerConfig,
    depth: Cell<usize>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over the given module state.
    #[must_use]
    pub fn new(state: &'a ModuleState, config: &'a AnalyzerConfig) -> Self {
        Self {
            state,
            config,
            depth: Cell::new(0),
        }
    }

    /// Resolves `expr` to a taint value, or `None` when nothing is known.
    pub fn resolve(&self, expr: &Expr) -> Option<TaintValue> {
        // Depth bound against adversarially nested input.
        if self.depth.get() > MAX_RESOLVE_DEPTH {
            return None;
        }
        self.depth.set(self.depth.get() + 1);
        let resolved = self.dispatch(expr);
        self.depth.set(self.depth.get() - 1);
        resolved
    }

    fn dispatch(&self, expr: &Expr) -> Option<TaintValue> {
        match expr {
            Expr::Ident(ident) => self.resolve_parts(&[ident.sym.as_ref().to_owned()]),
            Expr::Member(member) => self.resolve_member(member),
            Expr::OptChain(chain) => match chain.base.as_ref() {
                OptChainBase::Member(member) => self.resolve_member(member),
                OptChainBase::Call(call) => self.resolve_call_like(&call.callee, &call.args),
            },
            Expr::Call(call) => self.resolve_call(call),
            Expr::New(new_expr) => self.resolve_new(new_expr),
            // Prefer whichever branch reaches a host API; `cons` first.
            Expr::Cond(cond) => {
                let cons = self.resolve(&cond.cons);
                if cons.as_ref().is_some_and(TaintValue::is_host) {
                    return cons;
                }
                let alt = self.resolve(&cond.alt);
                if alt.as_ref().is_some_and(TaintValue::is_host) {
                    return alt;
                }
                cons.or(alt)
            }
            Expr::Bin(bin) => match bin.op {
                // `a && b` yields `b` when `a` is truthy.
                BinaryOp::LogicalAnd => {
                    let right = self.resolve(&bin.right);
                    if right.as_ref().is_some_and(TaintValue::is_host) {
                        return right;
                    }
                    let left = self.resolve(&bin.left);
                    if left.as_ref().is_some_and(TaintValue::is_host) {
                        return left;
                    }
                    right.or(left)
                }
                BinaryOp::LogicalOr | BinaryOp::NullishCoalescing => {
                    let left = self.resolve(&bin.left);
                    if left.as_ref().is_some_and(TaintValue::is_host) {
                        return left;
                    }
                    let right = self.resolve(&bin.right);
                    if right.as_ref().is_some_and(TaintValue::is_host) {
                        return right;
                    }
                    left.or(right)
                }
                _ => consteval::try_evaluate(expr, self.state).map(TaintValue::Literal),
            },
            Expr::Seq(seq) => seq.exprs.last().and_then(|last| self.resolve(last)),
            Expr::Assign(assign) => self.resolve(&assign.right),
            Expr::Await(await_expr) => self.resolve(&await_expr.arg),
            Expr::Yield(yield_expr) => yield_expr.arg.as_deref().and_then(|arg| self.resolve(arg)),
            Expr::Paren(paren) => self.resolve(&paren.expr),
            Expr::Lit(_) | Expr::Tpl(_) | Expr::Object(_) => {
                consteval::try_evaluate(expr, self.state).map(TaintValue::Literal)
            }
            // Everything else (functions, classes, `this` outside a member
            // chain, JSX, ...) carries no standalone information.
            _ => None,
        }
    }

    /// Resolves a member chain built from the innermost base outward.
    fn resolve_member(&self, member: &MemberExpr) -> Option<TaintValue> {
        let mut rev_segments = vec![self.prop_segment(&member.prop)];
        let mut base: &Expr = &member.obj;
        loop {
            match base {
                Expr::Member(inner) => {
                    rev_segments.push(self.prop_segment(&inner.prop));
                    base = &inner.obj;
                }
                Expr::Paren(paren) => base = &paren.expr,
                Expr::OptChain(chain) => match chain.base.as_ref() {
                    OptChainBase::Member(inner) => {
                        rev_segments.push(self.prop_segment(&inner.prop));
                        base = &inner.obj;
                    }
                    OptChainBase::Call(_) => break,
                },
                _ => break,
            }
        }
        let segments: Vec<String> = rev_segments.into_iter().rev().collect();

        match base {
            Expr::Ident(ident) => {
                let mut parts = vec![ident.sym.as_ref().to_owned()];
                parts.extend(segments);
                self.resolve_parts(&parts)
            }
            // `this.field` is matched best-effort against every recorded
            // `ClassName_instance.field` key in the module.
            Expr::This(_) => {
                let (first, rest) = segments.split_first()?;
                let value = self.state.instance_field(first)?.clone();
                Some(extend_all(value, rest))
            }
            _ => {
                let value = self.resolve(base)?;
                if value.is_host() {
                    return Some(extend_all(value, &segments));
                }
                if let TaintValue::Literal(sym) = value {
                    let mut parts = split_path(&sym);
                    parts.extend(segments);
                    return self.resolve_parts(&parts);
                }
                None
            }
        }
    }

    /// Resolves a textual segment chain: alias stripping, host roots, then
    /// recorded synthetic paths at the deepest recorded depth first.
    fn resolve_parts(&self, parts: &[String]) -> Option<TaintValue> {
        if self.depth.get() > MAX_RESOLVE_DEPTH {
            return None;
        }
        self.depth.set(self.depth.get() + 1);
        let resolved = self.resolve_parts_inner(parts);
        self.depth.set(self.depth.get() - 1);
        resolved
    }

    fn resolve_parts_inner(&self, parts: &[String]) -> Option<TaintValue> {
        let mut parts = parts;
        while parts.len() > 1 && self.config.is_global_alias(&parts[0]) {
            parts = &parts[1..];
        }
        let head = parts.first()?;

        if self.config.is_host_root(head) {
            return Some(extend_all(
                TaintValue::Concrete(head.clone()),
                &parts[1..],
            ));
        }

        for depth in (1..=parts.len()).rev() {
            let key = join_path(&parts[..depth]);
            let Some(value) = self.state.preferred(&key) else {
                continue;
            };
            let rest = &parts[depth..];
            if value.is_host() {
                return Some(extend_all(value.clone(), rest));
            }
            if let TaintValue::Literal(sym) = value {
                if rest.is_empty() {
                    return Some(TaintValue::Literal(sym.clone()));
                }
                let mut expanded = split_path(sym);
                expanded.extend(rest.iter().cloned());
                if expanded.as_slice() != parts {
                    if let Some(resolved) = self.resolve_parts(&expanded) {
                        return Some(resolved);
                    }
                }
            }
        }

        // `eval`/`Function` aliases and bare global aliases stay symbolic so
        // indirection through bindings keeps working.
        if parts.len() == 1
            && (head == "eval" || head == "Function" || self.config.is_global_alias(head))
        {
            return Some(TaintValue::Literal(head.clone()));
        }
        None
    }

    /// Resolves a recorded binding key (or synthetic path) by segments.
    #[must_use]
    pub fn resolve_key(&self, key: &str) -> Option<TaintValue> {
        self.resolve_parts(&split_path(key))
    }

    fn resolve_call(&self, call: &CallExpr) -> Option<TaintValue> {
        match &call.callee {
            Callee::Expr(callee) => self.resolve_call_like(callee, &call.args),
            _ => None,
        }
    }

    /// Specialized resolvers for call results, tried in order.
    fn resolve_call_like(&self, callee: &Expr, args: &[ExprOrSpread]) -> Option<TaintValue> {
        let callee = strip_parens(callee);

        // Static-method return values recorded under `ClassName.method()`.
        if let Some(path) = static_path_text(callee) {
            if let Some(value) = self.state.preferred(&format!("{path}()")) {
                return Some(value.clone());
            }
        }

        if let Expr::Member(member) = callee {
            let prop = ident_prop(&member.prop);
            let obj = strip_parens(&member.obj);

            // Reflect.get(target, prop) builds `target.prop`.
            if ident_is(obj, "Reflect") && prop == Some("get") {
                let target = self.resolve(&args.first()?.expr)?;
                if target.is_host() {
                    let segment = args
                        .get(1)
                        .and_then(|arg| consteval::try_evaluate(&arg.expr, self.state))
                        .unwrap_or_else(|| DYNAMIC_MARKER.to_owned());
                    return Some(target.extend(&segment));
                }
                return None;
            }

            if let Some(name) = prop {
                // Promise chaining propagates the underlying value.
                if constants::promise_chain_methods().contains(name) {
                    return self.resolve(&member.obj);
                }
                // `.call`/`.apply`/`.bind` unwrap to the underlying callee.
                if constants::call_unwrappers().contains(name) {
                    return self.resolve(&member.obj);
                }
                // Promise.resolve(x) / Promise.reject(x) wrap `x`.
                if ident_is(obj, "Promise") && (name == "resolve" || name == "reject") {
                    return args.first().and_then(|arg| self.resolve(&arg.expr));
                }
                // Map/WeakMap.get against a map tracked via `.set`.
                if name == "get" {
                    if let Some(map_name) = static_path_text(&member.obj) {
                        if let Some(values) = self.state.map_values(&map_name) {
                            if let Some(found) = values.iter().find(|v| v.is_host()) {
                                return Some(found.clone());
                            }
                        }
                    }
                }
                // Iterator contents are rarely statically enumerable.
                if name == "next" {
                    if let Some(value) = self.resolve(&member.obj) {
                        if value.is_host() {
                            return Some(value.to_dynamic());
                        }
                    }
                }
            }
        }

        // Immediately-invoked function expressions: resolve a single-return
        // body. Async wrappers produce a promise; `.then` chaining above
        // already sees through it, so resolution is not blocked here.
        if let Some(body) = iife_body_expr(callee) {
            return self.resolve(body);
        }

        None
    }

    fn resolve_new(&self, new_expr: &NewExpr) -> Option<TaintValue> {
        let callee = strip_parens(&new_expr.callee);
        if let Some(value) = self.resolve(callee) {
            if value.is_host() {
                return Some(value);
            }
        }
        // Constructor identity: `new C().field` resolves through the
        // recorded `C_instance.*` synthetic keys.
        if let Expr::Ident(ident) = callee {
            return Some(TaintValue::Literal(format!("{}_instance", ident.sym)));
        }
        None
    }

    /// One member-chain segment: a literal name, a folded computed name, or
    /// the dynamic placeholder.
    fn prop_segment(&self, prop: &MemberProp) -> String {
        match prop {
            MemberProp::Ident(ident) => ident.sym.as_ref().to_owned(),
            MemberProp::PrivateName(private) => format!("#{}", private.id.sym),
            MemberProp::Computed(computed) => {
                consteval::try_evaluate(&computed.expr, self.state)
                    .unwrap_or_else(|| DYNAMIC_MARKER.to_owned())
            }
        }
    }
}

/// Applies every remaining segment to a resolved base value.
pub(super) fn extend_all<S: AsRef<str>>(value: TaintValue, segments: &[S]) -> TaintValue {
    segments
        .iter()
        .fold(value, |acc, seg| acc.extend(seg.as_ref()))
}

/// Splits a binding key back into its segments (`a.b[0]` -> `a`, `b`, `0`).
pub(super) fn split_path(path: &str) -> Vec<String> {
    path.replace('[', ".")
        .replace(']', "")
        .split('.')
        .filter(|seg| !seg.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Unwraps parenthesized expressions.
pub(super) fn strip_parens(expr: &Expr) -> &Expr {
    let mut expr = expr;
    while let Expr::Paren(paren) = expr {
        expr = &paren.expr;
    }
    expr
}

/// The literal name of a non-computed member property.
pub(super) fn ident_prop(prop: &MemberProp) -> Option<&str> {
    match prop {
        MemberProp::Ident(ident) => Some(ident.sym.as_ref()),
        _ => None,
    }
}

/// Whether an expression is a bare identifier with the given name.
pub(super) fn ident_is(expr: &Expr, name: &str) -> bool {
    matches!(strip_parens(expr), Expr::Ident(ident) if ident.sym.as_ref() == name)
}

/// The dotted text of an identifier or literal member chain, with no
/// resolution applied.
pub(super) fn static_path_text(expr: &Expr) -> Option<String> {
    match strip_parens(expr) {
        Expr::Ident(ident) => Some(ident.sym.as_ref().to_owned()),
        Expr::Member(member) => {
            let base = static_path_text(&member.obj)?;
            let segment = ident_prop(&member.prop)?;
            Some(join_segment(&base, segment))
        }
        _ => None,
    }
}

/// The single returned expression of an immediately-invokable callee.
pub(super) fn iife_body_expr(callee: &Expr) -> Option<&Expr> {
    match strip_parens(callee) {
        Expr::Arrow(arrow) => match arrow.body.as_ref() {
            BlockStmtOrExpr::Expr(body) => Some(body),
            BlockStmtOrExpr::BlockStmt(block) => consteval::single_return(&block.stmts),
        },
        Expr::Fn(fn_expr) => fn_expr
            .function
            .body
            .as_ref()
            .and_then(|body| consteval::single_return(&body.stmts)),
        _ => None,
    }
}
