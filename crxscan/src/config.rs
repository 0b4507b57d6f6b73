//! Analyzer configuration.

/// Configuration for an [`crate::Analyzer`].
///
/// The set of global names that reach the privileged host namespace is
/// configurable because extension code reaches it under several spellings:
/// the namespace roots themselves (`chrome`, `browser`) and the global-object
/// aliases that prefix them (`globalThis.chrome`, `self.chrome`, ...).
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Root names of the privileged host namespace.
    pub host_roots: Vec<String>,
    /// Global-object aliases that are transparent prefixes of a host root.
    pub global_aliases: Vec<String>,
    /// Emit `log::debug!` tracing for module visits and recorded findings.
    pub debug: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            host_roots: vec!["chrome".to_owned(), "browser".to_owned()],
            global_aliases: vec![
                "globalThis".to_owned(),
                "self".to_owned(),
                "window".to_owned(),
            ],
            debug: false,
        }
    }
}

impl AnalyzerConfig {
    /// Creates a config recognizing only the given host namespace roots.
    #[must_use]
    pub fn with_host_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host_roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Whether `name` is a root of the host namespace.
    #[must_use]
    pub fn is_host_root(&self, name: &str) -> bool {
        self.host_roots.iter().any(|r| r == name)
    }

    /// Whether `name` aliases the global object.
    #[must_use]
    pub fn is_global_alias(&self, name: &str) -> bool {
        self.global_aliases.iter().any(|a| a == name)
    }
}
