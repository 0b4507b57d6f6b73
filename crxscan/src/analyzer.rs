//! The analysis facade: entry points in, sorted API usage plus metrics out.

use crate::aggregate;
use crate::config::AnalyzerConfig;
use crate::engine;
use crate::graph;
use crate::metrics;
use serde::Serialize;

/// Supplies module source text by id. The only I/O boundary of the engine;
/// implemented for any `Fn(&str) -> anyhow::Result<String>` closure.
pub trait FileFetcher {
    /// Returns the source text for a module id.
    ///
    /// # Errors
    ///
    /// Any error is treated as "module missing": the branch is pruned with
    /// a warning and the analysis continues.
    fn fetch(&self, id: &str) -> anyhow::Result<String>;
}

impl<F> FileFetcher for F
where
    F: Fn(&str) -> anyhow::Result<String>,
{
    fn fetch(&self, id: &str) -> anyhow::Result<String> {
        self(id)
    }
}

/// The result of one `analyze` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    /// Number of modules the walk attempted (size of the visited set).
    pub modules: usize,
    /// Function and arrow-function definitions across visited modules.
    pub functions: usize,
    /// Export declarations across visited modules.
    pub exports: usize,
    /// Canonicalized, deduplicated, lexicographically sorted API usage.
    pub apis: Vec<String>,
}

impl AnalysisReport {
    /// Serializes the report as JSON.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Static taint analyzer for one extension package at a time.
///
/// Holds only configuration: every `analyze` call allocates its own visited
/// set, per-module tables, and finding accumulator, so distinct calls may
/// run concurrently without coordination.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Creates an analyzer with the given configuration.
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyzes the transitive closure of modules reachable from
    /// `entrypoints` and returns the merged report.
    ///
    /// Never fails as a whole: missing modules, parse failures, and
    /// unresolvable expressions are isolated per module or per node.
    pub fn analyze<F: FileFetcher + ?Sized>(
        &self,
        entrypoints: &[String],
        fetcher: &F,
    ) -> AnalysisReport {
        let resolved = graph::resolve_modules(entrypoints, fetcher, &self.config);

        let mut functions = 0;
        let mut exports = 0;
        let mut per_module = Vec::with_capacity(resolved.modules.len());
        for module in &resolved.modules {
            per_module.push(engine::run(&module.ast, &self.config));
            let counts = metrics::count_module(&module.ast);
            functions += counts.functions;
            exports += counts.exports;
        }

        let apis = aggregate::merge_findings(per_module);
        if self.config.debug {
            log::debug!(
                "analysis finished: {} module(s), {} finding(s)",
                resolved.visited.len(),
                apis.len()
            );
        }
        AnalysisReport {
            modules: resolved.visited.len(),
            functions,
            exports,
            apis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_files(files: &'static [(&'static str, &'static str)]) -> AnalysisReport {
        let fetcher = move |id: &str| -> anyhow::Result<String> {
            files
                .iter()
                .find(|(name, _)| *name == id)
                .map(|(_, source)| (*source).to_owned())
                .ok_or_else(|| anyhow::anyhow!("not in package: {id}"))
        };
        Analyzer::default().analyze(&["main.js".to_owned()], &fetcher)
    }

    fn analyze_src(source: &'static str) -> AnalysisReport {
        analyze_files(Box::leak(Box::new([("main.js", source)])))
    }

    #[test]
    fn direct_call_is_reported() {
        let report = analyze_src(r#"chrome.runtime.sendMessage("hi");"#);
        assert_eq!(report.apis, vec!["chrome.runtime.sendMessage".to_owned()]);
    }

    #[test]
    fn alias_chain_matches_direct_call() {
        let report = analyze_src("var a = chrome.runtime; var b = a; b.sendMessage('hi');");
        assert_eq!(report.apis, vec!["chrome.runtime.sendMessage".to_owned()]);
    }

    #[test]
    fn nested_destructuring_resolves() {
        let report = analyze_src(
            "const { runtime: { onMessage } } = chrome; onMessage.addListener(() => {});",
        );
        assert!(report
            .apis
            .contains(&"chrome.runtime.onMessage.addListener".to_owned()));
    }

    #[test]
    fn folded_computed_access_matches_direct_call() {
        let report = analyze_src(r#"chrome["r" + "untime"].sendMessage("hi");"#);
        assert!(report.apis.contains(&"chrome.runtime.sendMessage".to_owned()));
    }

    #[test]
    fn unfoldable_computed_access_keeps_a_dynamic_marker() {
        let report = analyze_src("const k = prompt(); chrome[k].query({});");
        assert!(
            report.apis.iter().any(|api| api.ends_with(".Dynamic")),
            "expected a dynamic-marker finding, got {:?}",
            report.apis
        );
    }

    #[test]
    fn cyclic_imports_terminate_and_count_once() {
        let report = analyze_files(&[
            ("main.js", "import './other.js'; chrome.tabs.query({});"),
            ("other.js", "import './main.js'; chrome.windows.create({});"),
        ]);
        assert_eq!(report.modules, 2);
        assert_eq!(
            report.apis,
            vec![
                "chrome.tabs.query".to_owned(),
                "chrome.windows.create".to_owned(),
            ]
        );
    }

    #[test]
    fn analysis_is_deterministic() {
        let files: &'static [(&'static str, &'static str)] = &[
            ("main.js", "import './dep.js'; chrome.tabs.query({});"),
            ("dep.js", "chrome.cookies.getAll({}); export const x = 1;"),
        ];
        let first = analyze_files(files);
        let second = analyze_files(files);
        assert_eq!(first, second);
        assert_eq!(
            first.to_json().expect("report serializes"),
            second.to_json().expect("report serializes")
        );
    }

    #[test]
    fn host_free_code_reports_counts_but_no_apis() {
        let report = analyze_src(
            "function f() { return 1; } const g = () => f(); export const x = g();",
        );
        assert!(report.apis.is_empty());
        assert_eq!(report.modules, 1);
        assert_eq!(report.functions, 2);
        assert_eq!(report.exports, 1);
    }

    #[test]
    fn reflect_get_builds_the_target_path() {
        let report = analyze_src(r#"Reflect.get(chrome.storage, "local");"#);
        assert_eq!(report.apis, vec!["chrome.storage.local".to_owned()]);
    }

    #[test]
    fn map_storage_round_trips_taint() {
        let report = analyze_src(
            "const m = new Map(); m.set('k', chrome.cookies); \
             const h = m.get('k'); h.getAll({});",
        );
        assert!(report.apis.contains(&"chrome.cookies.getAll".to_owned()));
    }

    #[test]
    fn promise_chaining_is_not_reported_as_an_api() {
        let report = analyze_src("chrome.storage.local.get('k').then(v => v);");
        assert_eq!(report.apis, vec!["chrome.storage.local.get".to_owned()]);
    }

    #[test]
    fn promise_resolve_of_tainted_value_is_dynamic() {
        let report = analyze_src("Promise.resolve(chrome.tabs);");
        assert_eq!(report.apis, vec!["chrome.tabs.Dynamic".to_owned()]);
    }

    #[test]
    fn eval_alias_flags_dynamic_execution() {
        let report = analyze_src("const e = eval; e('payload');");
        assert_eq!(report.apis, vec!["DYNAMIC".to_owned()]);
    }

    #[test]
    fn function_constructor_flags_dynamic_execution() {
        let report = analyze_src("new Function('return 1')();");
        assert_eq!(report.apis, vec!["DYNAMIC".to_owned()]);
    }

    #[test]
    fn eval_with_tainted_argument_records_both() {
        let report = analyze_src("eval(chrome.runtime.id);");
        assert_eq!(
            report.apis,
            vec!["DYNAMIC".to_owned(), "chrome.runtime.id.Dynamic".to_owned()]
        );
    }

    #[test]
    fn conditional_taint_fans_out_over_all_candidates() {
        let report = analyze_src(
            "let b; if (Math.random() > 0.5) { b = chrome.tabs; } else { b = chrome.windows; } \
             b.create({});",
        );
        assert_eq!(
            report.apis,
            vec![
                "chrome.tabs.create".to_owned(),
                "chrome.windows.create".to_owned(),
            ]
        );
    }

    #[test]
    fn object_enumeration_of_tainted_target_is_dynamic() {
        let report = analyze_src("Object.keys(chrome.storage);");
        assert_eq!(report.apis, vec!["chrome.storage.Dynamic".to_owned()]);
    }

    #[test]
    fn call_unwrapping_resolves_the_underlying_callee() {
        let report = analyze_src("chrome.runtime.sendMessage.call(null, 'hi');");
        assert_eq!(report.apis, vec!["chrome.runtime.sendMessage".to_owned()]);
    }

    #[test]
    fn iife_return_values_carry_taint() {
        let report = analyze_src(
            "const api = (function () { return chrome.downloads; })(); api.download({});",
        );
        assert!(report.apis.contains(&"chrome.downloads.download".to_owned()));
    }

    #[test]
    fn iife_parameters_bind_call_site_arguments() {
        let report = analyze_src("(function (api) { api.query({}); })(chrome.tabs);");
        assert!(report.apis.contains(&"chrome.tabs.query".to_owned()));
    }

    #[test]
    fn arguments_object_is_modeled() {
        let report = analyze_src("(function () { arguments[0].query({}); })(chrome.tabs);");
        assert!(report.apis.contains(&"chrome.tabs.query".to_owned()));
    }

    #[test]
    fn class_members_flatten_to_synthetic_keys() {
        let report = analyze_src(
            "class Api { constructor() { this.port = chrome.runtime; } \
               static tabs() { return chrome.tabs; } } \
             const t = Api.tabs(); t.query({}); \
             const inst = new Api(); inst.port.connect();",
        );
        assert!(report.apis.contains(&"chrome.tabs.query".to_owned()));
        assert!(report.apis.contains(&"chrome.runtime.connect".to_owned()));
    }

    #[test]
    fn this_access_resolves_against_instance_fields() {
        let report = analyze_src(
            "class Port { constructor() { this.rt = chrome.runtime; } \
               send(msg) { this.rt.sendMessage(msg); } }",
        );
        assert!(report.apis.contains(&"chrome.runtime.sendMessage".to_owned()));
    }

    #[test]
    fn global_alias_prefixes_are_transparent() {
        let report = analyze_src("globalThis.chrome.management.getAll(() => {});");
        assert_eq!(report.apis, vec!["chrome.management.getAll".to_owned()]);
    }

    #[test]
    fn tainted_argument_to_unknown_function_is_dynamic() {
        let report = analyze_src("function mystery(x) {} mystery(chrome.debugger);");
        assert!(report.apis.contains(&"chrome.debugger.Dynamic".to_owned()));
    }

    #[test]
    fn missing_module_is_non_fatal() {
        let report = analyze_files(&[(
            "main.js",
            "import './vanished.js'; chrome.idle.queryState(60, () => {});",
        )]);
        assert_eq!(report.modules, 2);
        assert_eq!(report.apis, vec!["chrome.idle.queryState".to_owned()]);
    }

    #[test]
    fn conditional_expressions_prefer_the_tainted_branch() {
        let report = analyze_src("const api = flag ? chrome.tabs : fallback; api.query({});");
        assert_eq!(report.apis, vec!["chrome.tabs.query".to_owned()]);
    }

    #[test]
    fn logical_fallbacks_reach_the_tainted_operand() {
        let report = analyze_src("const api = maybe || chrome.runtime; api.connect();");
        assert_eq!(report.apis, vec!["chrome.runtime.connect".to_owned()]);
    }

    #[test]
    fn comma_operator_indirect_calls_resolve() {
        let report = analyze_src("(0, chrome.runtime.sendMessage)('hi');");
        assert_eq!(report.apis, vec!["chrome.runtime.sendMessage".to_owned()]);
    }

    #[test]
    fn optional_chaining_resolves_like_plain_access() {
        let report = analyze_src("chrome?.tabs?.query({});");
        assert_eq!(report.apis, vec!["chrome.tabs.query".to_owned()]);
    }

    #[test]
    fn custom_host_roots_are_respected() {
        let analyzer = Analyzer::new(AnalyzerConfig::with_host_roots(["browser"]));
        let fetcher = |_: &str| -> anyhow::Result<String> {
            Ok("browser.runtime.sendMessage('hi'); chrome.tabs.query({});".to_owned())
        };
        let report = analyzer.analyze(&["main.js".to_owned()], &fetcher);
        assert_eq!(report.apis, vec!["browser.runtime.sendMessage".to_owned()]);
    }
}
