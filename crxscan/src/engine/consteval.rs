//! Best-effort compile-time folding of constant expressions.
//!
//! Obfuscated extension code hides property names behind concatenation,
//! template strings, and `toString` overrides; folding them back to plain
//! strings lets computed member access resolve like literal access.

use super::state::ModuleState;
use swc_ecma_ast::{
    BinExpr, BinaryOp, BlockStmtOrExpr, Expr, Lit, ObjectLit, Prop, PropName, PropOrSpread, Stmt,
    Tpl,
};

/// Folds an expression to a constant string, or `None` when any part is
/// unresolvable.
///
/// `None` is never an empty string: callers must treat it as "cannot
/// determine" and fall back to a dynamic marker rather than skipping the
/// access.
#[must_use]
pub fn try_evaluate(expr: &Expr, state: &ModuleState) -> Option<String> {
    match expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.as_ref().to_owned()),
        Expr::Lit(Lit::Num(n)) => Some(format_number(n.value)),
        Expr::Paren(paren) => try_evaluate(&paren.expr, state),
        Expr::Tpl(tpl) => fold_template(tpl, state),
        Expr::Bin(bin) => fold_concat(bin, state),
        // Single-valued constant bindings participate in folding.
        Expr::Ident(ident) => state.single_literal(ident.sym.as_ref()).map(str::to_owned),
        // The `() => "name"` stringify-override idiom.
        Expr::Arrow(arrow) => match arrow.body.as_ref() {
            BlockStmtOrExpr::Expr(body) => try_evaluate(body, state),
            BlockStmtOrExpr::BlockStmt(block) => single_return(&block.stmts)
                .and_then(|ret| try_evaluate(ret, state)),
        },
        // The `{ toString() { return "name" } }` stringify-override idiom.
        Expr::Object(obj) => fold_stringify_override(obj, state),
        _ => None,
    }
}

/// Folds a template literal, resolving each interpolation recursively.
fn fold_template(tpl: &Tpl, state: &ModuleState) -> Option<String> {
    let mut out = String::new();
    for (i, quasi) in tpl.quasis.iter().enumerate() {
        match &quasi.cooked {
            Some(cooked) => out.push_str(cooked.as_ref()),
            None => out.push_str(quasi.raw.as_ref()),
        }
        if let Some(hole) = tpl.exprs.get(i) {
            out.push_str(&try_evaluate(hole, state)?);
        }
    }
    Some(out)
}

/// Folds `"a" + "b"` string concatenation.
fn fold_concat(bin: &BinExpr, state: &ModuleState) -> Option<String> {
    if bin.op != BinaryOp::Add {
        return None;
    }
    let left = try_evaluate(&bin.left, state)?;
    let right = try_evaluate(&bin.right, state)?;
    Some(format!("{left}{right}"))
}

/// Recognizes an object literal whose `toString` member returns a constant
/// and treats that constant as the object's value.
pub(super) fn fold_stringify_override(obj: &ObjectLit, state: &ModuleState) -> Option<String> {
    for prop in &obj.props {
        let PropOrSpread::Prop(prop) = prop else {
            continue;
        };
        match prop.as_ref() {
            Prop::Method(method) if prop_name_is(&method.key, "toString") => {
                let body = method.function.body.as_ref()?;
                return single_return(&body.stmts).and_then(|ret| try_evaluate(ret, state));
            }
            Prop::KeyValue(kv) if prop_name_is(&kv.key, "toString") => {
                return try_evaluate(&kv.value, state);
            }
            _ => {}
        }
    }
    None
}

/// The returned expression of a body consisting of a single `return`.
pub(super) fn single_return(stmts: &[Stmt]) -> Option<&Expr> {
    match stmts {
        [Stmt::Return(ret)] => ret.arg.as_deref(),
        _ => None,
    }
}

/// Whether a property name is the given literal name.
pub(super) fn prop_name_is(name: &PropName, expected: &str) -> bool {
    match name {
        PropName::Ident(ident) => ident.sym.as_ref() == expected,
        PropName::Str(s) => s.value.as_ref() == expected,
        _ => false,
    }
}

/// Formats a numeric literal the way it would appear as a property name.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::TaintValue;
    use crate::parser::parse_source;
    use swc_ecma_ast::{ModuleItem, Stmt};

    fn first_expr(source: &str) -> Expr {
        let module = parse_source(source).expect("test source should parse");
        match module.body.into_iter().next() {
            Some(ModuleItem::Stmt(Stmt::Expr(stmt))) => *stmt.expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn folds_string_concatenation() {
        let expr = first_expr(r#""r" + "untime";"#);
        let state = ModuleState::new();
        assert_eq!(try_evaluate(&expr, &state), Some("runtime".to_owned()));
    }

    #[test]
    fn folds_template_with_literal_binding() {
        let expr = first_expr("`send${suffix}`;");
        let mut state = ModuleState::new();
        state.record("suffix", TaintValue::Literal("Message".to_owned()));
        assert_eq!(try_evaluate(&expr, &state), Some("sendMessage".to_owned()));
    }

    #[test]
    fn unresolvable_interpolation_is_none_not_empty() {
        let expr = first_expr("`send${mystery}`;");
        let state = ModuleState::new();
        assert_eq!(try_evaluate(&expr, &state), None);
    }

    #[test]
    fn folds_tostring_override() {
        let expr = first_expr(r#"({ toString() { return "cookies" } });"#);
        let state = ModuleState::new();
        assert_eq!(try_evaluate(&expr, &state), Some("cookies".to_owned()));
    }

    #[test]
    fn folds_arrow_stringify() {
        let expr = first_expr(r#"(() => "tabs");"#);
        let state = ModuleState::new();
        assert_eq!(try_evaluate(&expr, &state), Some("tabs".to_owned()));
    }

    #[test]
    fn integral_numbers_drop_the_fraction() {
        let expr = first_expr("0;");
        let state = ModuleState::new();
        assert_eq!(try_evaluate(&expr, &state), Some("0".to_owned()));
    }
}
