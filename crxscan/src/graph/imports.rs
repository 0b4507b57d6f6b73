//! Static import discovery and specifier normalization.
//!
//! Dependencies are discovered from `import`/`export ... from` declarations
//! and from `require(...)`, `importScripts(...)`, and `import(...)` calls
//! whose argument is a string literal. Dynamic imports with non-literal
//! arguments are not followed; that is a documented limitation, not an
//! error.

use swc_ecma_ast::{
    BlockStmtOrExpr, Callee, Class, ClassMember, Decl, DefaultDecl, Expr, Function, Lit, Module,
    ModuleDecl, ModuleItem, OptChainBase, Prop, PropOrSpread, Stmt, VarDeclOrExpr,
};

/// Collects every statically-resolvable import specifier in a module, in
/// source order. Specifiers are raw; see [`normalize_specifier`].
#[must_use]
pub fn collect_imports(module: &Module) -> Vec<String> {
    let mut specifiers = Vec::new();
    for item in &module.body {
        match item {
            ModuleItem::ModuleDecl(decl) => match decl {
                ModuleDecl::Import(import) => {
                    specifiers.push(import.src.value.as_ref().to_owned());
                }
                ModuleDecl::ExportNamed(export) => {
                    if let Some(src) = &export.src {
                        specifiers.push(src.value.as_ref().to_owned());
                    }
                }
                ModuleDecl::ExportAll(export) => {
                    specifiers.push(export.src.value.as_ref().to_owned());
                }
                ModuleDecl::ExportDecl(export) => collect_decl(&export.decl, &mut specifiers),
                ModuleDecl::ExportDefaultDecl(export) => match &export.decl {
                    DefaultDecl::Fn(fn_expr) => collect_function(&fn_expr.function, &mut specifiers),
                    DefaultDecl::Class(class_expr) => {
                        collect_class(&class_expr.class, &mut specifiers);
                    }
                    DefaultDecl::TsInterfaceDecl(_) => {}
                },
                ModuleDecl::ExportDefaultExpr(export) => {
                    collect_expr(&export.expr, &mut specifiers);
                }
                _ => {}
            },
            ModuleItem::Stmt(stmt) => collect_stmt(stmt, &mut specifiers),
        }
    }
    specifiers
}

fn collect_stmts(stmts: &[Stmt], out: &mut Vec<String>) {
    for stmt in stmts {
        collect_stmt(stmt, out);
    }
}

fn collect_stmt(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Decl(decl) => collect_decl(decl, out),
        Stmt::Block(block) => collect_stmts(&block.stmts, out),
        Stmt::Expr(expr_stmt) => collect_expr(&expr_stmt.expr, out),
        Stmt::If(if_stmt) => {
            collect_expr(&if_stmt.test, out);
            collect_stmt(&if_stmt.cons, out);
            if let Some(alt) = &if_stmt.alt {
                collect_stmt(alt, out);
            }
        }
        Stmt::While(while_stmt) => {
            collect_expr(&while_stmt.test, out);
            collect_stmt(&while_stmt.body, out);
        }
        Stmt::DoWhile(do_while) => {
            collect_stmt(&do_while.body, out);
            collect_expr(&do_while.test, out);
        }
        Stmt::For(for_stmt) => {
            match &for_stmt.init {
                Some(VarDeclOrExpr::VarDecl(var)) => {
                    for declarator in &var.decls {
                        if let Some(init) = &declarator.init {
                            collect_expr(init, out);
                        }
                    }
                }
                Some(VarDeclOrExpr::Expr(expr)) => collect_expr(expr, out),
                None => {}
            }
            if let Some(test) = &for_stmt.test {
                collect_expr(test, out);
            }
            if let Some(update) = &for_stmt.update {
                collect_expr(update, out);
            }
            collect_stmt(&for_stmt.body, out);
        }
        Stmt::ForIn(for_in) => {
            collect_expr(&for_in.right, out);
            collect_stmt(&for_in.body, out);
        }
        Stmt::ForOf(for_of) => {
            collect_expr(&for_of.right, out);
            collect_stmt(&for_of.body, out);
        }
        Stmt::Return(ret) => {
            if let Some(arg) = &ret.arg {
                collect_expr(arg, out);
            }
        }
        Stmt::Throw(throw) => collect_expr(&throw.arg, out),
        Stmt::Try(try_stmt) => {
            collect_stmts(&try_stmt.block.stmts, out);
            if let Some(handler) = &try_stmt.handler {
                collect_stmts(&handler.body.stmts, out);
            }
            if let Some(finalizer) = &try_stmt.finalizer {
                collect_stmts(&finalizer.stmts, out);
            }
        }
        Stmt::Switch(switch_stmt) => {
            collect_expr(&switch_stmt.discriminant, out);
            for case in &switch_stmt.cases {
                if let Some(test) = &case.test {
                    collect_expr(test, out);
                }
                collect_stmts(&case.cons, out);
            }
        }
        Stmt::Labeled(labeled) => collect_stmt(&labeled.body, out),
        _ => {}
    }
}

fn collect_decl(decl: &Decl, out: &mut Vec<String>) {
    match decl {
        Decl::Var(var) => {
            for declarator in &var.decls {
                if let Some(init) = &declarator.init {
                    collect_expr(init, out);
                }
            }
        }
        Decl::Fn(fn_decl) => collect_function(&fn_decl.function, out),
        Decl::Class(class_decl) => collect_class(&class_decl.class, out),
        _ => {}
    }
}

fn collect_function(function: &Function, out: &mut Vec<String>) {
    if let Some(body) = &function.body {
        collect_stmts(&body.stmts, out);
    }
}

fn collect_class(class: &Class, out: &mut Vec<String>) {
    for member in &class.body {
        match member {
            ClassMember::Method(method) => collect_function(&method.function, out),
            ClassMember::PrivateMethod(method) => collect_function(&method.function, out),
            ClassMember::Constructor(ctor) => {
                if let Some(body) = &ctor.body {
                    collect_stmts(&body.stmts, out);
                }
            }
            ClassMember::StaticBlock(static_block) => {
                collect_stmts(&static_block.body.stmts, out);
            }
            _ => {}
        }
    }
}

fn collect_expr(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Call(call) => {
            match &call.callee {
                // Dynamic `import("...")` with a literal argument is
                // statically followable.
                Callee::Import(_) => {
                    if let Some(spec) = literal_first_arg(call) {
                        out.push(spec);
                    }
                }
                Callee::Expr(callee) => {
                    if let Expr::Ident(ident) = callee.as_ref() {
                        match ident.sym.as_ref() {
                            "require" => {
                                if let Some(spec) = literal_first_arg(call) {
                                    out.push(spec);
                                }
                            }
                            // Every literal argument of importScripts loads.
                            "importScripts" => {
                                for arg in &call.args {
                                    if let Expr::Lit(Lit::Str(s)) = arg.expr.as_ref() {
                                        out.push(s.value.as_ref().to_owned());
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                    collect_expr(callee, out);
                }
                Callee::Super(_) => {}
            }
            for arg in &call.args {
                collect_expr(&arg.expr, out);
            }
        }
        Expr::New(new_expr) => {
            collect_expr(&new_expr.callee, out);
            if let Some(args) = &new_expr.args {
                for arg in args {
                    collect_expr(&arg.expr, out);
                }
            }
        }
        Expr::OptChain(chain) => match chain.base.as_ref() {
            OptChainBase::Member(member) => collect_expr(&member.obj, out),
            OptChainBase::Call(call) => {
                collect_expr(&call.callee, out);
                for arg in &call.args {
                    collect_expr(&arg.expr, out);
                }
            }
        },
        Expr::Member(member) => collect_expr(&member.obj, out),
        Expr::Assign(assign) => collect_expr(&assign.right, out),
        Expr::Bin(bin) => {
            collect_expr(&bin.left, out);
            collect_expr(&bin.right, out);
        }
        Expr::Cond(cond) => {
            collect_expr(&cond.test, out);
            collect_expr(&cond.cons, out);
            collect_expr(&cond.alt, out);
        }
        Expr::Seq(seq) => {
            for inner in &seq.exprs {
                collect_expr(inner, out);
            }
        }
        Expr::Paren(paren) => collect_expr(&paren.expr, out),
        Expr::Unary(unary) => collect_expr(&unary.arg, out),
        Expr::Await(await_expr) => collect_expr(&await_expr.arg, out),
        Expr::Fn(fn_expr) => collect_function(&fn_expr.function, out),
        Expr::Arrow(arrow) => match arrow.body.as_ref() {
            BlockStmtOrExpr::BlockStmt(block) => collect_stmts(&block.stmts, out),
            BlockStmtOrExpr::Expr(body) => collect_expr(body, out),
        },
        Expr::Class(class_expr) => collect_class(&class_expr.class, out),
        Expr::Object(obj) => {
            for prop in &obj.props {
                match prop {
                    PropOrSpread::Prop(prop) => match prop.as_ref() {
                        Prop::KeyValue(kv) => collect_expr(&kv.value, out),
                        Prop::Method(method) => collect_function(&method.function, out),
                        _ => {}
                    },
                    PropOrSpread::Spread(spread) => collect_expr(&spread.expr, out),
                }
            }
        }
        Expr::Array(arr) => {
            for elem in arr.elems.iter().flatten() {
                collect_expr(&elem.expr, out);
            }
        }
        Expr::Tpl(tpl) => {
            for inner in &tpl.exprs {
                collect_expr(inner, out);
            }
        }
        _ => {}
    }
}

/// The first argument of a call when it is a plain string literal.
fn literal_first_arg(call: &swc_ecma_ast::CallExpr) -> Option<String> {
    match call.args.first()?.expr.as_ref() {
        Expr::Lit(Lit::Str(s)) => Some(s.value.as_ref().to_owned()),
        _ => None,
    }
}

/// Normalizes an import specifier against the importing module's directory,
/// producing a canonical package-relative id.
///
/// Returns `None` for bare package specifiers, which cannot be resolved
/// inside an unpacked extension.
#[must_use]
pub fn normalize_specifier(specifier: &str, importer: &str) -> Option<String> {
    let spec = specifier.trim();
    if spec.is_empty() {
        return None;
    }

    let joined = if let Some(rooted) = spec.strip_prefix('/') {
        // Rooted ids resolve against the package root.
        rooted.to_owned()
    } else if spec.starts_with("./") || spec.starts_with("../") || path_like(spec) {
        match importer.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{spec}"),
            None => spec.to_owned(),
        }
    } else {
        return None;
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Traversal above the package root is clamped.
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return None;
    }

    let mut id = segments.join("/");
    if !segments
        .last()
        .is_some_and(|name| name.rsplit_once('.').is_some())
    {
        id.push_str(".js");
    }
    Some(id)
}

/// Whether a prefix-less specifier still names a packaged file
/// (importScripts-style worker-relative paths) rather than a bare package.
fn path_like(spec: &str) -> bool {
    spec.ends_with(".js")
        || spec.ends_with(".mjs")
        || spec.ends_with(".cjs")
        || spec.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    #[test]
    fn collects_static_and_call_imports() {
        let module = parse_source(
            r#"
            import { a } from './a.js';
            export * from './b.js';
            const c = require('./c.js');
            importScripts('util.js', 'other.js');
            import('./lazy.js').then(m => m.go());
            import(someVariable);
            "#,
        )
        .expect("test source should parse");
        let specs = collect_imports(&module);
        assert_eq!(
            specs,
            vec!["./a.js", "./b.js", "./c.js", "util.js", "other.js", "./lazy.js"]
        );
    }

    #[test]
    fn normalizes_relative_specifiers() {
        assert_eq!(
            normalize_specifier("./util.js", "background/main.js"),
            Some("background/util.js".to_owned())
        );
        assert_eq!(
            normalize_specifier("../shared/api.js", "background/main.js"),
            Some("shared/api.js".to_owned())
        );
        assert_eq!(
            normalize_specifier("/vendor/lib.js", "background/main.js"),
            Some("vendor/lib.js".to_owned())
        );
    }

    #[test]
    fn appends_js_when_extension_missing() {
        assert_eq!(
            normalize_specifier("./util", "main.js"),
            Some("util.js".to_owned())
        );
    }

    #[test]
    fn bare_package_specifiers_are_not_followed() {
        assert_eq!(normalize_specifier("lodash", "main.js"), None);
        assert_eq!(normalize_specifier("", "main.js"), None);
    }

    #[test]
    fn traversal_above_root_is_clamped() {
        assert_eq!(
            normalize_specifier("../../escape.js", "main.js"),
            Some("escape.js".to_owned())
        );
    }

    #[test]
    fn worker_relative_scripts_resolve_against_importer() {
        assert_eq!(
            normalize_specifier("util.js", "workers/sync.js"),
            Some("workers/util.js".to_owned())
        );
    }
}
