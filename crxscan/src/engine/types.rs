//! The taint value domain.

use crate::constants::DYNAMIC_MARKER;
use smallvec::SmallVec;

/// What the engine knows about one possible value of a binding or expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaintValue {
    /// A canonical dotted host-API path, e.g. `chrome.storage.local.get`.
    Concrete(String),
    /// A known constant (string literal, folded expression, or a symbolic
    /// binding path such as `Settings_instance`).
    Literal(String),
    /// Derived from a host API but with an unresolvable suffix; the path
    /// already contains the dynamic marker segment.
    Dynamic(String),
    /// No information.
    Unknown,
}

/// The set of possible values a binding may hold (union over branches and
/// reassignments). Two slots inline cover the common single- or
/// double-valued case.
pub type ValueSet = SmallVec<[TaintValue; 2]>;

impl TaintValue {
    /// Whether this value carries host-API taint.
    #[must_use]
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Concrete(_) | Self::Dynamic(_))
    }

    /// The canonical path for host-tainted values.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Concrete(p) | Self::Dynamic(p) => Some(p),
            _ => None,
        }
    }

    /// The constant for literal values.
    #[must_use]
    pub fn literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Appends one property segment, preserving the taint kind.
    ///
    /// A `Dynamic` value absorbs further segments: everything after the
    /// marker is truncated during aggregation anyway. Extending `Concrete`
    /// with the marker segment itself produces `Dynamic`.
    #[must_use]
    pub fn extend(&self, segment: &str) -> Self {
        match self {
            Self::Concrete(p) if segment == DYNAMIC_MARKER => {
                Self::Dynamic(join_segment(p, segment))
            }
            Self::Concrete(p) => Self::Concrete(join_segment(p, segment)),
            Self::Dynamic(p) => Self::Dynamic(p.clone()),
            Self::Literal(s) => Self::Literal(join_segment(s, segment)),
            Self::Unknown => Self::Unknown,
        }
    }

    /// Marks a host-tainted value as having an unresolvable continuation.
    #[must_use]
    pub fn to_dynamic(&self) -> Self {
        match self {
            Self::Concrete(p) => Self::Dynamic(join_segment(p, DYNAMIC_MARKER)),
            other => other.clone(),
        }
    }
}

/// Joins a path and one further segment: numeric segments use index
/// notation (`base[0]`), everything else dotted notation (`base.prop`).
#[must_use]
pub fn join_segment(base: &str, segment: &str) -> String {
    if segment.bytes().all(|b| b.is_ascii_digit()) && !segment.is_empty() {
        format!("{base}[{segment}]")
    } else {
        format!("{base}.{segment}")
    }
}

/// Joins a full segment list into a binding key / path.
#[must_use]
pub fn join_path(parts: &[String]) -> String {
    let mut iter = parts.iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    iter.fold(first.clone(), |acc, seg| join_segment(&acc, seg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_keeps_concrete_concrete() {
        let v = TaintValue::Concrete("chrome.runtime".to_owned());
        assert_eq!(
            v.extend("sendMessage"),
            TaintValue::Concrete("chrome.runtime.sendMessage".to_owned())
        );
    }

    #[test]
    fn extend_with_marker_goes_dynamic() {
        let v = TaintValue::Concrete("chrome.storage".to_owned());
        let extended = v.extend(DYNAMIC_MARKER);
        assert_eq!(
            extended,
            TaintValue::Dynamic("chrome.storage.Dynamic".to_owned())
        );
        // Further segments are absorbed.
        assert_eq!(extended.extend("anything"), extended);
    }

    #[test]
    fn numeric_segments_use_index_notation() {
        assert_eq!(join_segment("handlers", "0"), "handlers[0]");
        assert_eq!(join_segment("handlers", "get"), "handlers.get");
    }

    #[test]
    fn unknown_never_gains_a_path() {
        assert_eq!(TaintValue::Unknown.extend("x"), TaintValue::Unknown);
        assert!(TaintValue::Unknown.path().is_none());
    }
}
