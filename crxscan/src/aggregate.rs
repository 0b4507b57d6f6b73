//! Merging and canonicalization of per-module findings.

use crate::constants::DYNAMIC_MARKER;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// Truncates a finding at (and including) its first dynamic marker segment,
/// so distinct dynamic suffixes collapse to one entry.
#[must_use]
pub fn canonicalize(finding: &str) -> String {
    let mut kept = Vec::new();
    for segment in finding.split('.') {
        kept.push(segment);
        if segment == DYNAMIC_MARKER {
            break;
        }
    }
    kept.join(".")
}

/// Merges per-module finding sets into one canonicalized, deduplicated,
/// lexicographically sorted list.
#[must_use]
pub fn merge_findings<I>(per_module: I) -> Vec<String>
where
    I: IntoIterator<Item = FxHashSet<String>>,
{
    let merged: BTreeSet<String> = per_module
        .into_iter()
        .flatten()
        .map(|finding| canonicalize(&finding))
        .collect();
    merged.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_at_first_marker() {
        assert_eq!(
            canonicalize("chrome.storage.Dynamic.sync.get"),
            "chrome.storage.Dynamic"
        );
        assert_eq!(
            canonicalize("chrome.runtime.sendMessage"),
            "chrome.runtime.sendMessage"
        );
        assert_eq!(canonicalize("DYNAMIC"), "DYNAMIC");
    }

    #[test]
    fn distinct_dynamic_suffixes_collapse() {
        let mut set = FxHashSet::default();
        set.insert("chrome.tabs.Dynamic.a".to_owned());
        set.insert("chrome.tabs.Dynamic.b".to_owned());
        assert_eq!(merge_findings([set]), vec!["chrome.tabs.Dynamic".to_owned()]);
    }

    #[test]
    fn merged_output_is_sorted_and_deduplicated() {
        let mut first = FxHashSet::default();
        first.insert("chrome.tabs.query".to_owned());
        let mut second = FxHashSet::default();
        second.insert("chrome.runtime.sendMessage".to_owned());
        second.insert("chrome.tabs.query".to_owned());
        assert_eq!(
            merge_findings([first, second]),
            vec![
                "chrome.runtime.sendMessage".to_owned(),
                "chrome.tabs.query".to_owned(),
            ]
        );
    }
}
