//! crxscan - best-effort static taint analysis of browser-extension JavaScript.
//!
//! Inspects the unpacked source of a third-party extension and reports every
//! reachable use of privileged host APIs (`chrome.*`, `browser.*`), even when
//! the code obscures those calls through aliasing, destructuring, computed
//! property access, wrapper functions, `Reflect`, `Map`/`WeakMap` storage,
//! promises, or dynamic code execution. The output drives a security
//! decision, so the analysis over-approximates: an unresolvable construct
//! adjacent to known host-API taint is reported with a dynamic marker rather
//! than silently dropped.
//!
//! The engine consumes ASTs produced by swc; it does not build a parser of
//! its own. Analysis is flow-insensitive per module and deliberately not
//! sound against arbitrary obfuscation.
//!
//! # Example
//!
//! ```
//! use crxscan::{Analyzer, AnalyzerConfig};
//!
//! let fetch = |id: &str| -> anyhow::Result<String> {
//!     match id {
//!         "background.js" => Ok("chrome.runtime.sendMessage('hi');".to_owned()),
//!         _ => anyhow::bail!("no such file: {id}"),
//!     }
//! };
//! let report = Analyzer::new(AnalyzerConfig::default())
//!     .analyze(&["background.js".to_owned()], &fetch);
//! assert_eq!(report.apis, vec!["chrome.runtime.sendMessage".to_owned()]);
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod parser;

pub use analyzer::{AnalysisReport, Analyzer, FileFetcher};
pub use config::AnalyzerConfig;
pub use engine::types::TaintValue;
pub use error::AnalysisError;
