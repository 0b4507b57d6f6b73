//! End-to-end analysis of an unpacked package laid out on disk, the way the
//! CLI consumer drives the engine.

use crxscan::{Analyzer, AnalyzerConfig};
use std::fs;

#[test]
fn analyzes_an_unpacked_package_from_disk() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = tempfile::tempdir().expect("temp dir should be creatable");
    fs::create_dir_all(dir.path().join("lib")).expect("lib dir should be creatable");
    fs::write(
        dir.path().join("background.js"),
        "import './lib/api.js';\nchrome.tabs.query({});\n",
    )
    .expect("background.js should write");
    fs::write(
        dir.path().join("lib").join("api.js"),
        "export const send = chrome.runtime.sendMessage;\nsend('ping');\n",
    )
    .expect("api.js should write");

    let root = dir.path().to_path_buf();
    let fetch = move |id: &str| -> anyhow::Result<String> { Ok(fs::read_to_string(root.join(id))?) };

    let report =
        Analyzer::new(AnalyzerConfig::default()).analyze(&["background.js".to_owned()], &fetch);

    assert_eq!(report.modules, 2);
    assert_eq!(report.exports, 1);
    assert_eq!(
        report.apis,
        vec![
            "chrome.runtime.sendMessage".to_owned(),
            "chrome.tabs.query".to_owned(),
        ]
    );
}

#[test]
fn unreadable_entrypoint_yields_an_empty_report() {
    let dir = tempfile::tempdir().expect("temp dir should be creatable");
    let root = dir.path().to_path_buf();
    let fetch = move |id: &str| -> anyhow::Result<String> { Ok(fs::read_to_string(root.join(id))?) };

    let report =
        Analyzer::new(AnalyzerConfig::default()).analyze(&["nothing.js".to_owned()], &fetch);

    assert_eq!(report.modules, 1);
    assert_eq!(report.functions, 0);
    assert!(report.apis.is_empty());
}
