//! Thin wrapper around the off-the-shelf swc parser.
//!
//! Extension packages mix ES modules and classic scripts (service workers
//! using `importScripts`), so parsing auto-detects and classic scripts are
//! normalized into a `Module` body for the rest of the engine.

use swc_common::BytePos;
use swc_ecma_ast::{Module, ModuleItem, Program};
use swc_ecma_parser::{Parser, StringInput, Syntax};

/// Parses JavaScript source into a module AST.
///
/// # Errors
///
/// Returns the parser diagnostic as a string when the source is malformed.
/// Callers treat this as a per-module failure, never as a fatal one.
pub fn parse_source(source: &str) -> Result<Module, String> {
    let input = StringInput::new(
        source,
        BytePos(0),
        BytePos(u32::try_from(source.len()).unwrap_or(u32::MAX)),
    );
    let mut parser = Parser::new(Syntax::Es(Default::default()), input, None);
    match parser.parse_program() {
        Ok(Program::Module(module)) => Ok(module),
        Ok(Program::Script(script)) => Ok(Module {
            span: script.span,
            body: script.body.into_iter().map(ModuleItem::Stmt).collect(),
            shebang: script.shebang,
        }),
        Err(err) => Err(format!("{err:?}")),
    }
}
