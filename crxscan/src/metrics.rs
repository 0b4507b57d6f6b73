//! Structural counts, computed by a separate pass independent of the taint
//! walk: function/arrow-function definitions and export declarations.

use swc_ecma_ast::{
    BlockStmtOrExpr, Callee, Class, ClassMember, Decl, DefaultDecl, Expr, Function, Module,
    ModuleDecl, ModuleItem, OptChainBase, Prop, PropOrSpread, Stmt, VarDeclOrExpr,
};

/// Counts for one module.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModuleCounts {
    /// Function declarations/expressions, arrows, and method definitions.
    pub functions: usize,
    /// Top-level export declarations.
    pub exports: usize,
}

/// Counts functions and exports in a module.
#[must_use]
pub fn count_module(module: &Module) -> ModuleCounts {
    let mut counts = ModuleCounts::default();
    for item in &module.body {
        match item {
            ModuleItem::ModuleDecl(decl) => {
                match decl {
                    ModuleDecl::ExportDecl(_)
                    | ModuleDecl::ExportNamed(_)
                    | ModuleDecl::ExportDefaultDecl(_)
                    | ModuleDecl::ExportDefaultExpr(_)
                    | ModuleDecl::ExportAll(_) => counts.exports += 1,
                    _ => {}
                }
                match decl {
                    ModuleDecl::ExportDecl(export) => count_decl(&export.decl, &mut counts),
                    ModuleDecl::ExportDefaultDecl(export) => match &export.decl {
                        DefaultDecl::Fn(fn_expr) => {
                            counts.functions += 1;
                            count_function(&fn_expr.function, &mut counts);
                        }
                        DefaultDecl::Class(class_expr) => {
                            count_class(&class_expr.class, &mut counts);
                        }
                        DefaultDecl::TsInterfaceDecl(_) => {}
                    },
                    ModuleDecl::ExportDefaultExpr(export) => count_expr(&export.expr, &mut counts),
                    _ => {}
                }
            }
            ModuleItem::Stmt(stmt) => count_stmt(stmt, &mut counts),
        }
    }
    counts
}

fn count_stmts(stmts: &[Stmt], counts: &mut ModuleCounts) {
    for stmt in stmts {
        count_stmt(stmt, counts);
    }
}

fn count_stmt(stmt: &Stmt, counts: &mut ModuleCounts) {
    match stmt {
        Stmt::Decl(decl) => count_decl(decl, counts),
        Stmt::Block(block) => count_stmts(&block.stmts, counts),
        Stmt::Expr(expr_stmt) => count_expr(&expr_stmt.expr, counts),
        Stmt::If(if_stmt) => {
            count_expr(&if_stmt.test, counts);
            count_stmt(&if_stmt.cons, counts);
            if let Some(alt) = &if_stmt.alt {
                count_stmt(alt, counts);
            }
        }
        Stmt::While(while_stmt) => {
            count_expr(&while_stmt.test, counts);
            count_stmt(&while_stmt.body, counts);
        }
        Stmt::DoWhile(do_while) => {
            count_stmt(&do_while.body, counts);
            count_expr(&do_while.test, counts);
        }
        Stmt::For(for_stmt) => {
            match &for_stmt.init {
                Some(VarDeclOrExpr::VarDecl(var)) => {
                    for declarator in &var.decls {
                        if let Some(init) = &declarator.init {
                            count_expr(init, counts);
                        }
                    }
                }
                Some(VarDeclOrExpr::Expr(expr)) => count_expr(expr, counts),
                None => {}
            }
            if let Some(test) = &for_stmt.test {
                count_expr(test, counts);
            }
            if let Some(update) = &for_stmt.update {
                count_expr(update, counts);
            }
            count_stmt(&for_stmt.body, counts);
        }
        Stmt::ForIn(for_in) => {
            count_expr(&for_in.right, counts);
            count_stmt(&for_in.body, counts);
        }
        Stmt::ForOf(for_of) => {
            count_expr(&for_of.right, counts);
            count_stmt(&for_of.body, counts);
        }
        Stmt::Return(ret) => {
            if let Some(arg) = &ret.arg {
                count_expr(arg, counts);
            }
        }
        Stmt::Throw(throw) => count_expr(&throw.arg, counts),
        Stmt::Try(try_stmt) => {
            count_stmts(&try_stmt.block.stmts, counts);
            if let Some(handler) = &try_stmt.handler {
                count_stmts(&handler.body.stmts, counts);
            }
            if let Some(finalizer) = &try_stmt.finalizer {
                count_stmts(&finalizer.stmts, counts);
            }
        }
        Stmt::Switch(switch_stmt) => {
            count_expr(&switch_stmt.discriminant, counts);
            for case in &switch_stmt.cases {
                if let Some(test) = &case.test {
                    count_expr(test, counts);
                }
                count_stmts(&case.cons, counts);
            }
        }
        Stmt::Labeled(labeled) => count_stmt(&labeled.body, counts),
        _ => {}
    }
}

fn count_decl(decl: &Decl, counts: &mut ModuleCounts) {
    match decl {
        Decl::Var(var) => {
            for declarator in &var.decls {
                if let Some(init) = &declarator.init {
                    count_expr(init, counts);
                }
            }
        }
        Decl::Fn(fn_decl) => {
            counts.functions += 1;
            count_function(&fn_decl.function, counts);
        }
        Decl::Class(class_decl) => count_class(&class_decl.class, counts),
        _ => {}
    }
}

fn count_function(function: &Function, counts: &mut ModuleCounts) {
    if let Some(body) = &function.body {
        count_stmts(&body.stmts, counts);
    }
}

fn count_class(class: &Class, counts: &mut ModuleCounts) {
    for member in &class.body {
        match member {
            ClassMember::Method(method) => {
                counts.functions += 1;
                count_function(&method.function, counts);
            }
            ClassMember::PrivateMethod(method) => {
                counts.functions += 1;
                count_function(&method.function, counts);
            }
            ClassMember::Constructor(ctor) => {
                counts.functions += 1;
                if let Some(body) = &ctor.body {
                    count_stmts(&body.stmts, counts);
                }
            }
            ClassMember::ClassProp(prop) => {
                if let Some(value) = &prop.value {
                    count_expr(value, counts);
                }
            }
            ClassMember::StaticBlock(static_block) => {
                count_stmts(&static_block.body.stmts, counts);
            }
            _ => {}
        }
    }
}

fn count_expr(expr: &Expr, counts: &mut ModuleCounts) {
    match expr {
        Expr::Fn(fn_expr) => {
            counts.functions += 1;
            count_function(&fn_expr.function, counts);
        }
        Expr::Arrow(arrow) => {
            counts.functions += 1;
            match arrow.body.as_ref() {
                BlockStmtOrExpr::BlockStmt(block) => count_stmts(&block.stmts, counts),
                BlockStmtOrExpr::Expr(body) => count_expr(body, counts),
            }
        }
        Expr::Class(class_expr) => count_class(&class_expr.class, counts),
        Expr::Call(call) => {
            if let Callee::Expr(callee) = &call.callee {
                count_expr(callee, counts);
            }
            for arg in &call.args {
                count_expr(&arg.expr, counts);
            }
        }
        Expr::New(new_expr) => {
            count_expr(&new_expr.callee, counts);
            if let Some(args) = &new_expr.args {
                for arg in args {
                    count_expr(&arg.expr, counts);
                }
            }
        }
        Expr::OptChain(chain) => match chain.base.as_ref() {
            OptChainBase::Member(member) => count_expr(&member.obj, counts),
            OptChainBase::Call(call) => {
                count_expr(&call.callee, counts);
                for arg in &call.args {
                    count_expr(&arg.expr, counts);
                }
            }
        },
        Expr::Member(member) => count_expr(&member.obj, counts),
        Expr::Assign(assign) => count_expr(&assign.right, counts),
        Expr::Bin(bin) => {
            count_expr(&bin.left, counts);
            count_expr(&bin.right, counts);
        }
        Expr::Cond(cond) => {
            count_expr(&cond.test, counts);
            count_expr(&cond.cons, counts);
            count_expr(&cond.alt, counts);
        }
        Expr::Seq(seq) => {
            for inner in &seq.exprs {
                count_expr(inner, counts);
            }
        }
        Expr::Paren(paren) => count_expr(&paren.expr, counts),
        Expr::Unary(unary) => count_expr(&unary.arg, counts),
        Expr::Await(await_expr) => count_expr(&await_expr.arg, counts),
        Expr::Yield(yield_expr) => {
            if let Some(arg) = &yield_expr.arg {
                count_expr(arg, counts);
            }
        }
        Expr::Object(obj) => {
            for prop in &obj.props {
                match prop {
                    PropOrSpread::Prop(prop) => match prop.as_ref() {
                        Prop::KeyValue(kv) => count_expr(&kv.value, counts),
                        Prop::Method(method) => {
                            counts.functions += 1;
                            count_function(&method.function, counts);
                        }
                        Prop::Getter(getter) => {
                            counts.functions += 1;
                            if let Some(body) = &getter.body {
                                count_stmts(&body.stmts, counts);
                            }
                        }
                        Prop::Setter(setter) => {
                            counts.functions += 1;
                            if let Some(body) = &setter.body {
                                count_stmts(&body.stmts, counts);
                            }
                        }
                        _ => {}
                    },
                    PropOrSpread::Spread(spread) => count_expr(&spread.expr, counts),
                }
            }
        }
        Expr::Array(arr) => {
            for elem in arr.elems.iter().flatten() {
                count_expr(&elem.expr, counts);
            }
        }
        Expr::Tpl(tpl) => {
            for inner in &tpl.exprs {
                count_expr(inner, counts);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    #[test]
    fn counts_functions_and_arrows() {
        let module = parse_source(
            "function a() {} const b = () => {}; const c = function () { return () => 1; };",
        )
        .expect("test source should parse");
        assert_eq!(count_module(&module).functions, 4);
    }

    #[test]
    fn counts_export_declarations() {
        let module = parse_source(
            "export const a = 1; export default function b() {} export * from './x.js';",
        )
        .expect("test source should parse");
        let counts = count_module(&module);
        assert_eq!(counts.exports, 3);
        assert_eq!(counts.functions, 1);
    }

    #[test]
    fn counts_class_methods() {
        let module = parse_source(
            "class A { constructor() {} run() {} static of() { return new A(); } }",
        )
        .expect("test source should parse");
        assert_eq!(count_module(&module).functions, 3);
    }
}
