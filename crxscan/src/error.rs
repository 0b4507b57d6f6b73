//! Error taxonomy for the analysis engine.
//!
//! None of these abort an `analyze` call: a missing or malformed module is
//! isolated to its own subtree and surfaced as a warning, and unresolvable
//! expressions are represented in the taint domain, not as errors.

use thiserror::Error;

/// Per-module failure encountered during the graph walk.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The fetcher could not produce source text for a module id.
    #[error("module `{id}` could not be fetched: {reason}")]
    MissingModule {
        /// Normalized module id.
        id: String,
        /// Underlying fetcher error.
        reason: String,
    },

    /// The module's source text did not parse.
    #[error("module `{id}` failed to parse: {reason}")]
    ParseFailure {
        /// Normalized module id.
        id: String,
        /// Parser diagnostic.
        reason: String,
    },
}
