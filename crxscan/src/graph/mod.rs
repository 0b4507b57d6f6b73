//! Module graph resolution: the transitive closure of files reachable from
//! the entry points.
//!
//! Depth-first with an id-indexed visited set checked immediately before
//! each fetch, so cyclic import graphs terminate and no module is fetched
//! or parsed twice per `analyze` call. A missing or malformed module prunes
//! its own branch only.

pub mod imports;

use crate::analyzer::FileFetcher;
use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::parser;
use rustc_hash::FxHashSet;
use swc_ecma_ast::Module;

/// One successfully fetched and parsed module.
#[derive(Debug)]
pub struct ParsedModule {
    /// Canonical package-relative id.
    pub id: String,
    /// Parsed AST.
    pub ast: Module,
}

/// The resolved reachable set.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// Every id the walk attempted, successful or not.
    pub visited: FxHashSet<String>,
    /// Modules that fetched and parsed, in visitation order.
    pub modules: Vec<ParsedModule>,
}

/// Walks the import graph from the given entry points.
pub fn resolve_modules<F: FileFetcher + ?Sized>(
    entrypoints: &[String],
    fetcher: &F,
    config: &AnalyzerConfig,
) -> ModuleGraph {
    let mut graph = ModuleGraph::default();
    for entry in entrypoints {
        visit(entry, fetcher, &mut graph, config);
    }
    graph
}

fn visit<F: FileFetcher + ?Sized>(
    id: &str,
    fetcher: &F,
    graph: &mut ModuleGraph,
    config: &AnalyzerConfig,
) {
    // Memo check before the fetch keeps cycles finite.
    if !graph.visited.insert(id.to_owned()) {
        return;
    }
    if config.debug {
        log::debug!("visiting module `{id}`");
    }

    let source = match fetcher.fetch(id) {
        Ok(source) => source,
        Err(err) => {
            log::warn!(
                "{}",
                AnalysisError::MissingModule {
                    id: id.to_owned(),
                    reason: err.to_string(),
                }
            );
            return;
        }
    };

    let ast = match parser::parse_source(&source) {
        Ok(ast) => ast,
        Err(reason) => {
            log::warn!(
                "{}",
                AnalysisError::ParseFailure {
                    id: id.to_owned(),
                    reason,
                }
            );
            return;
        }
    };

    let dependencies: Vec<String> = imports::collect_imports(&ast)
        .iter()
        .filter_map(|spec| imports::normalize_specifier(spec, id))
        .collect();
    graph.modules.push(ParsedModule {
        id: id.to_owned(),
        ast,
    });

    for dependency in dependencies {
        visit(&dependency, fetcher, graph, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher_of(files: &'static [(&'static str, &'static str)]) -> impl FileFetcher {
        move |id: &str| -> anyhow::Result<String> {
            files
                .iter()
                .find(|(name, _)| *name == id)
                .map(|(_, source)| (*source).to_owned())
                .ok_or_else(|| anyhow::anyhow!("not in package: {id}"))
        }
    }

    #[test]
    fn cyclic_imports_terminate_with_single_visits() {
        let fetcher = fetcher_of(&[
            ("a.js", "import './b.js'; export const a = 1;"),
            ("b.js", "import './a.js'; export const b = 2;"),
        ]);
        let graph = resolve_modules(
            &["a.js".to_owned()],
            &fetcher,
            &AnalyzerConfig::default(),
        );
        assert_eq!(graph.visited.len(), 2);
        assert_eq!(graph.modules.len(), 2);
    }

    #[test]
    fn missing_dependency_prunes_branch_only() {
        let fetcher = fetcher_of(&[(
            "main.js",
            "import './gone.js'; import './ok.js';",
        ), (
            "ok.js",
            "export const fine = true;",
        )]);
        let graph = resolve_modules(
            &["main.js".to_owned()],
            &fetcher,
            &AnalyzerConfig::default(),
        );
        // The missing id is visited (and counted) but yields no module.
        assert_eq!(graph.visited.len(), 3);
        assert_eq!(graph.modules.len(), 2);
    }

    #[test]
    fn malformed_module_does_not_abort_siblings() {
        let fetcher = fetcher_of(&[
            ("main.js", "import './bad.js'; import './good.js';"),
            ("bad.js", "const = broken"),
            ("good.js", "chrome.tabs.query({});"),
        ]);
        let graph = resolve_modules(
            &["main.js".to_owned()],
            &fetcher,
            &AnalyzerConfig::default(),
        );
        assert_eq!(graph.modules.len(), 2);
        assert!(graph.modules.iter().any(|m| m.id == "good.js"));
    }
}
