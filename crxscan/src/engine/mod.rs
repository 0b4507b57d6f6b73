//! Per-module analysis: one synchronous walk feeding the tracker, the
//! expression resolver, and the call classifier over a shared symbol table.
//!
//! The walk is exhaustive rather than reachability-aware: function bodies
//! are analyzed whether or not a call to them is proven, matching the
//! over-approximating posture of the engine.

pub mod calls;
pub mod consteval;
pub mod resolve;
pub mod state;
pub mod tracker;
pub mod types;

pub use state::ModuleState;

use crate::config::AnalyzerConfig;
use rustc_hash::FxHashSet;
use swc_ecma_ast::{
    BlockStmtOrExpr, Callee, Class, ClassMember, Decl, DefaultDecl, Expr, Function, Module,
    ModuleDecl, ModuleItem, OptChainBase, Pat, Prop, PropName, PropOrSpread, Stmt, VarDeclOrExpr,
};

/// Analyzes one module's AST and returns its raw findings.
#[must_use]
pub fn run(module: &Module, config: &AnalyzerConfig) -> FxHashSet<String> {
    let mut state = ModuleState::new();
    for item in &module.body {
        walk_module_item(item, &mut state, config);
    }
    if config.debug {
        log::debug!("module walk recorded {} finding(s)", state.findings.len());
    }
    state.findings
}

fn walk_module_item(item: &ModuleItem, state: &mut ModuleState, config: &AnalyzerConfig) {
    match item {
        ModuleItem::Stmt(stmt) => walk_stmt(stmt, state, config),
        ModuleItem::ModuleDecl(decl) => match decl {
            ModuleDecl::ExportDecl(export) => walk_decl(&export.decl, state, config),
            ModuleDecl::ExportDefaultDecl(export) => match &export.decl {
                DefaultDecl::Fn(fn_expr) => walk_function(&fn_expr.function, state, config),
                DefaultDecl::Class(class_expr) => {
                    if let Some(ident) = &class_expr.ident {
                        tracker::handle_class(
                            ident.sym.as_ref(),
                            &class_expr.class,
                            state,
                            config,
                        );
                    }
                    walk_class_bodies(&class_expr.class, state, config);
                }
                DefaultDecl::TsInterfaceDecl(_) => {}
            },
            ModuleDecl::ExportDefaultExpr(export) => scan_expr(&export.expr, state, config),
            // Import/re-export declarations belong to the module resolver.
            _ => {}
        },
    }
}

fn walk_stmts(stmts: &[Stmt], state: &mut ModuleState, config: &AnalyzerConfig) {
    for stmt in stmts {
        walk_stmt(stmt, state, config);
    }
}

fn walk_stmt(stmt: &Stmt, state: &mut ModuleState, config: &AnalyzerConfig) {
    match stmt {
        Stmt::Decl(decl) => walk_decl(decl, state, config),
        Stmt::Block(block) => walk_stmts(&block.stmts, state, config),
        Stmt::Expr(expr_stmt) => scan_expr(&expr_stmt.expr, state, config),
        Stmt::If(if_stmt) => {
            scan_expr(&if_stmt.test, state, config);
            walk_stmt(&if_stmt.cons, state, config);
            if let Some(alt) = &if_stmt.alt {
                walk_stmt(alt, state, config);
            }
        }
        Stmt::While(while_stmt) => {
            scan_expr(&while_stmt.test, state, config);
            walk_stmt(&while_stmt.body, state, config);
        }
        Stmt::DoWhile(do_while) => {
            walk_stmt(&do_while.body, state, config);
            scan_expr(&do_while.test, state, config);
        }
        Stmt::For(for_stmt) => {
            match &for_stmt.init {
                Some(VarDeclOrExpr::VarDecl(var)) => {
                    scan_var_inits(var, state, config);
                    tracker::handle_var_decl(var, state, config);
                }
                Some(VarDeclOrExpr::Expr(expr)) => scan_expr(expr, state, config),
                None => {}
            }
            if let Some(test) = &for_stmt.test {
                scan_expr(test, state, config);
            }
            if let Some(update) = &for_stmt.update {
                scan_expr(update, state, config);
            }
            walk_stmt(&for_stmt.body, state, config);
        }
        Stmt::ForIn(for_in) => {
            walk_for_head(&for_in.left, &for_in.right, state, config);
            walk_stmt(&for_in.body, state, config);
        }
        Stmt::ForOf(for_of) => {
            walk_for_head(&for_of.left, &for_of.right, state, config);
            walk_stmt(&for_of.body, state, config);
        }
        Stmt::Return(ret) => {
            if let Some(arg) = &ret.arg {
                scan_expr(arg, state, config);
            }
        }
        Stmt::Throw(throw) => scan_expr(&throw.arg, state, config),
        Stmt::Try(try_stmt) => {
            walk_stmts(&try_stmt.block.stmts, state, config);
            if let Some(handler) = &try_stmt.handler {
                walk_stmts(&handler.body.stmts, state, config);
            }
            if let Some(finalizer) = &try_stmt.finalizer {
                walk_stmts(&finalizer.stmts, state, config);
            }
        }
        Stmt::Switch(switch_stmt) => {
            scan_expr(&switch_stmt.discriminant, state, config);
            for case in &switch_stmt.cases {
                if let Some(test) = &case.test {
                    scan_expr(test, state, config);
                }
                walk_stmts(&case.cons, state, config);
            }
        }
        Stmt::Labeled(labeled) => walk_stmt(&labeled.body, state, config),
        Stmt::With(with_stmt) => {
            scan_expr(&with_stmt.obj, state, config);
            walk_stmt(&with_stmt.body, state, config);
        }
        _ => {}
    }
}

/// `for (… in/of rhs)`: iteration over a host-tainted container yields
/// dynamically-marked elements.
fn walk_for_head(
    left: &swc_ecma_ast::ForHead,
    right: &Expr,
    state: &mut ModuleState,
    config: &AnalyzerConfig,
) {
    scan_expr(right, state, config);
    let element = resolve::resolve_expr(right, state, config)
        .filter(types::TaintValue::is_host)
        .map_or(types::TaintValue::Unknown, |v| v.to_dynamic());
    match left {
        swc_ecma_ast::ForHead::VarDecl(var) => {
            for declarator in &var.decls {
                tracker::bind_pattern(&declarator.name, &element, state, config);
            }
        }
        swc_ecma_ast::ForHead::Pat(pat) => {
            tracker::bind_pattern(pat, &element, state, config);
        }
        _ => {}
    }
}

fn walk_decl(decl: &Decl, state: &mut ModuleState, config: &AnalyzerConfig) {
    match decl {
        Decl::Var(var) => {
            scan_var_inits(var, state, config);
            tracker::handle_var_decl(var, state, config);
        }
        Decl::Fn(fn_decl) => walk_function(&fn_decl.function, state, config),
        Decl::Class(class_decl) => {
            tracker::handle_class(class_decl.ident.sym.as_ref(), &class_decl.class, state, config);
            walk_class_bodies(&class_decl.class, state, config);
        }
        _ => {}
    }
}

/// Initializer expressions are scanned for call sites before the tracker
/// records the declarations they belong to.
fn scan_var_inits(var: &swc_ecma_ast::VarDecl, state: &mut ModuleState, config: &AnalyzerConfig) {
    for declarator in &var.decls {
        if let Some(init) = &declarator.init {
            scan_expr(init, state, config);
        }
    }
}

fn walk_function(function: &Function, state: &mut ModuleState, config: &AnalyzerConfig) {
    for param in &function.params {
        scan_pat(&param.pat, state, config);
    }
    if let Some(body) = &function.body {
        walk_stmts(&body.stmts, state, config);
    }
}

/// Default values inside patterns may themselves contain call sites.
fn scan_pat(pat: &Pat, state: &mut ModuleState, config: &AnalyzerConfig) {
    match pat {
        Pat::Assign(assign) => {
            scan_expr(&assign.right, state, config);
            scan_pat(&assign.left, state, config);
        }
        Pat::Array(arr) => {
            for elem in arr.elems.iter().flatten() {
                scan_pat(elem, state, config);
            }
        }
        Pat::Object(obj) => {
            for prop in &obj.props {
                match prop {
                    swc_ecma_ast::ObjectPatProp::KeyValue(kv) => scan_pat(&kv.value, state, config),
                    swc_ecma_ast::ObjectPatProp::Assign(assign) => {
                        if let Some(default) = &assign.value {
                            scan_expr(default, state, config);
                        }
                    }
                    swc_ecma_ast::ObjectPatProp::Rest(rest) => scan_pat(&rest.arg, state, config),
                }
            }
        }
        Pat::Rest(rest) => scan_pat(&rest.arg, state, config),
        _ => {}
    }
}

fn walk_class_bodies(class: &Class, state: &mut ModuleState, config: &AnalyzerConfig) {
    for member in &class.body {
        match member {
            ClassMember::Method(method) => walk_function(&method.function, state, config),
            ClassMember::PrivateMethod(method) => walk_function(&method.function, state, config),
            ClassMember::Constructor(ctor) => {
                if let Some(body) = &ctor.body {
                    walk_stmts(&body.stmts, state, config);
                }
            }
            ClassMember::ClassProp(prop) => {
                if let Some(value) = &prop.value {
                    scan_expr(value, state, config);
                }
            }
            ClassMember::StaticBlock(static_block) => {
                walk_stmts(&static_block.body.stmts, state, config);
            }
            _ => {}
        }
    }
}

/// Recursively scans an expression tree, classifying every call site and
/// applying assignments along the way.
fn scan_expr(expr: &Expr, state: &mut ModuleState, config: &AnalyzerConfig) {
    match expr {
        Expr::Call(call) => {
            calls::classify_call(call, state, config);
            if let Callee::Expr(callee) = &call.callee {
                // IIFE parameters are bound from the call-site arguments
                // before the body is walked.
                tracker::bind_iife_params(callee, &call.args, state, config);
                scan_expr(callee, state, config);
            }
            for arg in &call.args {
                scan_expr(&arg.expr, state, config);
            }
        }
        Expr::New(new_expr) => {
            calls::classify_new(new_expr, state, config);
            scan_expr(&new_expr.callee, state, config);
            if let Some(args) = &new_expr.args {
                for arg in args {
                    scan_expr(&arg.expr, state, config);
                }
            }
        }
        Expr::OptChain(chain) => match chain.base.as_ref() {
            OptChainBase::Member(member) => {
                scan_expr(&member.obj, state, config);
                if let swc_ecma_ast::MemberProp::Computed(computed) = &member.prop {
                    scan_expr(&computed.expr, state, config);
                }
            }
            OptChainBase::Call(call) => {
                calls::classify_call_like(&call.callee, &call.args, state, config);
                scan_expr(&call.callee, state, config);
                for arg in &call.args {
                    scan_expr(&arg.expr, state, config);
                }
            }
        },
        Expr::Assign(assign) => {
            tracker::handle_assign(assign, state, config);
            scan_expr(&assign.right, state, config);
        }
        Expr::Member(member) => {
            scan_expr(&member.obj, state, config);
            if let swc_ecma_ast::MemberProp::Computed(computed) = &member.prop {
                scan_expr(&computed.expr, state, config);
            }
        }
        Expr::Fn(fn_expr) => walk_function(&fn_expr.function, state, config),
        Expr::Arrow(arrow) => {
            for param in &arrow.params {
                scan_pat(param, state, config);
            }
            match arrow.body.as_ref() {
                BlockStmtOrExpr::BlockStmt(block) => walk_stmts(&block.stmts, state, config),
                BlockStmtOrExpr::Expr(body) => scan_expr(body, state, config),
            }
        }
        Expr::Class(class_expr) => {
            if let Some(ident) = &class_expr.ident {
                tracker::handle_class(ident.sym.as_ref(), &class_expr.class, state, config);
            }
            walk_class_bodies(&class_expr.class, state, config);
        }
        Expr::Object(obj) => {
            for prop in &obj.props {
                match prop {
                    PropOrSpread::Prop(prop) => match prop.as_ref() {
                        Prop::KeyValue(kv) => {
                            if let PropName::Computed(computed) = &kv.key {
                                scan_expr(&computed.expr, state, config);
                            }
                            scan_expr(&kv.value, state, config);
                        }
                        Prop::Method(method) => walk_function(&method.function, state, config),
                        Prop::Getter(getter) => {
                            if let Some(body) = &getter.body {
                                walk_stmts(&body.stmts, state, config);
                            }
                        }
                        Prop::Setter(setter) => {
                            if let Some(body) = &setter.body {
                                walk_stmts(&body.stmts, state, config);
                            }
                        }
                        _ => {}
                    },
                    PropOrSpread::Spread(spread) => scan_expr(&spread.expr, state, config),
                }
            }
        }
        Expr::Array(arr) => {
            for elem in arr.elems.iter().flatten() {
                scan_expr(&elem.expr, state, config);
            }
        }
        Expr::Bin(bin) => {
            scan_expr(&bin.left, state, config);
            scan_expr(&bin.right, state, config);
        }
        Expr::Cond(cond) => {
            scan_expr(&cond.test, state, config);
            scan_expr(&cond.cons, state, config);
            scan_expr(&cond.alt, state, config);
        }
        Expr::Seq(seq) => {
            for inner in &seq.exprs {
                scan_expr(inner, state, config);
            }
        }
        Expr::Paren(paren) => scan_expr(&paren.expr, state, config),
        Expr::Unary(unary) => scan_expr(&unary.arg, state, config),
        Expr::Update(update) => scan_expr(&update.arg, state, config),
        Expr::Await(await_expr) => scan_expr(&await_expr.arg, state, config),
        Expr::Yield(yield_expr) => {
            if let Some(arg) = &yield_expr.arg {
                scan_expr(arg, state, config);
            }
        }
        Expr::Tpl(tpl) => {
            for inner in &tpl.exprs {
                scan_expr(inner, state, config);
            }
        }
        Expr::TaggedTpl(tagged) => {
            scan_expr(&tagged.tag, state, config);
            for inner in &tagged.tpl.exprs {
                scan_expr(inner, state, config);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::types::TaintValue;
    use super::*;
    use crate::parser::parse_source;

    fn walk_source(source: &str) -> ModuleState {
        let module = parse_source(source).expect("test source should parse");
        let config = AnalyzerConfig::default();
        let mut state = ModuleState::new();
        for item in &module.body {
            walk_module_item(item, &mut state, &config);
        }
        state
    }

    #[test]
    fn declarations_record_resolved_initializers() {
        let state = walk_source("const rt = chrome.runtime;");
        assert_eq!(
            state.preferred("rt"),
            Some(&TaintValue::Concrete("chrome.runtime".to_owned()))
        );
    }

    #[test]
    fn array_destructuring_uses_index_paths() {
        let state = walk_source("const pair = [chrome.tabs, 'x']; const [t] = pair;");
        assert_eq!(
            state.preferred("pair[0]"),
            Some(&TaintValue::Concrete("chrome.tabs".to_owned()))
        );
        assert_eq!(
            state.preferred("t"),
            Some(&TaintValue::Concrete("chrome.tabs".to_owned()))
        );
    }

    #[test]
    fn rest_elements_are_opaque_arrays() {
        let state = walk_source("const [first, ...rest] = items;");
        assert_eq!(
            state.preferred("rest"),
            Some(&TaintValue::Literal("Array".to_owned()))
        );
    }

    #[test]
    fn object_literals_record_per_key_paths() {
        let state = walk_source("const api = { tabs: chrome.tabs, label: 'x' };");
        assert_eq!(
            state.preferred("api.tabs"),
            Some(&TaintValue::Concrete("chrome.tabs".to_owned()))
        );
        assert_eq!(
            state.preferred("api"),
            Some(&TaintValue::Literal("Object".to_owned()))
        );
    }

    #[test]
    fn tostring_override_becomes_the_literal_value() {
        let state = walk_source(r#"const key = { toString() { return "tabs" } };"#);
        assert_eq!(
            state.preferred("key"),
            Some(&TaintValue::Literal("tabs".to_owned()))
        );
    }

    #[test]
    fn conditional_reassignment_unions_instead_of_replacing() {
        let state = walk_source(
            "let api = chrome.tabs; if (cond) { api = chrome.windows; } api = null;",
        );
        let set = state.lookup("api").expect("binding recorded");
        assert!(set
            .contains(&TaintValue::Concrete("chrome.tabs".to_owned())));
        assert!(set
            .contains(&TaintValue::Concrete("chrome.windows".to_owned())));
    }

    #[test]
    fn class_static_returns_and_instance_fields_flatten() {
        let state = walk_source(
            "class Api { constructor() { this.port = chrome.runtime; } \
               static tabs() { return chrome.tabs; } }",
        );
        assert_eq!(
            state.preferred("Api.tabs()"),
            Some(&TaintValue::Concrete("chrome.tabs".to_owned()))
        );
        assert_eq!(
            state.preferred("Api_instance.port"),
            Some(&TaintValue::Concrete("chrome.runtime".to_owned()))
        );
    }

    #[test]
    fn member_assignment_targets_record_synthetic_keys() {
        let state = walk_source("const box = {}; box.api = chrome.cookies;");
        assert_eq!(
            state.preferred("box.api"),
            Some(&TaintValue::Concrete("chrome.cookies".to_owned()))
        );
    }

    #[test]
    fn iterator_next_is_dynamic_only_for_tainted_iterators() {
        let tainted = walk_source("const it = chrome.storage; const v = it.next();");
        assert!(matches!(
            tainted.preferred("v"),
            Some(TaintValue::Dynamic(_))
        ));

        let clean = walk_source("const it = makeIterator(); const v = it.next();");
        assert_eq!(clean.preferred("v"), Some(&TaintValue::Unknown));
        assert!(clean.findings.is_empty());
    }
}
