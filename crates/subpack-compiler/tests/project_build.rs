//! End-to-end builds of small mini-program projects on disk.

use std::fs;
use std::path::Path;

use serde_json::json;
use subpack_compiler::{ScriptCompiler, UsingComponentsScanner};
use subpack_core::{
    AppShell, AssetReconciler, DEPS_REPORT_FILE, DiagnosticKind, DistPathMapper,
    EntryDiscoveryOrchestrator, EntryRecord, OrchestratorOptions, PartitionSet,
};
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn sample_app() -> TempDir {
    project(&[
        ("src/app.js", "const log = require('./utils/log');\nApp({});\n"),
        (
            "src/pages/index/index.js",
            "const log = require('../../utils/log');\nimport { format } from '../../utils/format';\nPage({});\n",
        ),
        (
            "src/pages/index/index.json",
            r#"{ "usingComponents": { "card": "/components/card/card" } }"#,
        ),
        ("src/pages/index/index.wxml", "<card />"),
        (
            "src/components/card/card.js",
            "const { format } = require('../../utils/format');\nComponent({});\n",
        ),
        ("src/utils/log.js", "module.exports = console.log;\n"),
        ("src/utils/format.js", "exports.format = (v) => String(v);\n"),
        (
            "src/pkgA/pages/a.js",
            "require('../lib/helper');\nrequire('../lib/only');\nPage({});\n",
        ),
        ("src/pkgA/pages/b.js", "require('../lib/helper');\nPage({});\n"),
        ("src/pkgA/lib/helper.js", "module.exports = {};\n"),
        ("src/pkgA/lib/only.js", "module.exports = 1;\n"),
    ])
}

fn orchestrator(
    root: &Path,
    pages: &[&str],
    sub_packages: &[&str],
) -> EntryDiscoveryOrchestrator<ScriptCompiler, UsingComponentsScanner> {
    let source_root = root.join("src");
    let entries: Vec<_> = pages
        .iter()
        .map(|page| EntryRecord::manifest(&source_root, *page).unwrap())
        .collect();
    EntryDiscoveryOrchestrator::new(
        ScriptCompiler::new(&source_root, root),
        UsingComponentsScanner::new(&source_root),
        PartitionSet::new(sub_packages.iter().copied()).unwrap(),
        entries,
        OrchestratorOptions::new(&source_root),
    )
}

const PAGES: &[&str] = &[
    "app.js",
    "pages/index/index.js",
    "pkgA/pages/a.js",
    "pkgA/pages/b.js",
];

#[test]
fn discovers_components_and_partitions_shared_modules() {
    let dir = sample_app();
    let mut orch = orchestrator(dir.path(), PAGES, &["pkgA"]);

    let build = orch.run_to_convergence().unwrap();
    assert_eq!(build.passes, 2);
    assert!(build.entries.contains("components/card/card"));
    assert!(!build.has_errors(), "{:?}", build.diagnostics);

    let placements = orch.compiler().placements();
    assert_eq!(placements["pkgA/lib/helper.js"], "pkgA/commonchunks");
    assert_eq!(placements["pkgA/lib/only.js"], "pkgA/commonchunks");
    assert_eq!(placements["utils/format.js"], "common");
    assert_eq!(placements["utils/log.js"], "common");

    for key in [
        "app.js",
        "pages/index/index.js",
        "pages/index/index.json",
        "pages/index/index.wxml",
        "components/card/card.js",
        "pkgA/pages/a.js",
        "pkgA/commonchunks.js",
        "common.js",
    ] {
        assert!(build.assets.contains(key), "missing {key}");
    }

    let page = build.assets.get("pkgA/pages/a.js").and_then(|a| a.as_str()).unwrap();
    assert!(page.contains(r#"require("../commonchunks.js");"#));
}

#[test]
fn usage_sets_name_the_chunks_that_reach_a_module() {
    let dir = sample_app();
    let mut orch = orchestrator(dir.path(), PAGES, &["pkgA"]);
    let build = orch.run_to_convergence().unwrap();

    let format = subpack_core::ModuleId::from_relative("utils/format.js").unwrap();
    let usages: Vec<_> = build.usage.usages(&format).iter().cloned().collect();
    assert_eq!(usages, vec!["components/card/card.js", "pages/index/index.js"]);
}

#[test]
fn unresolved_imports_are_warnings_with_a_location() {
    let dir = project(&[("src/app.js", "\nconst x = require('./nowhere');\n")]);
    let mut orch = orchestrator(dir.path(), &["app.js"], &[]);
    let build = orch.run_to_convergence().unwrap();

    let warning = build.diagnostics.warnings().next().unwrap();
    assert_eq!(warning.kind, DiagnosticKind::Resolve);
    assert_eq!(warning.module.as_deref(), Some("app.js"));
    assert_eq!(warning.location(), "2:11");
    assert!(!build.has_errors());
}

#[test]
fn missing_page_source_is_a_compiler_error() {
    let dir = project(&[("src/app.js", "App({});\n")]);
    let mut orch = orchestrator(dir.path(), &["app.js", "pages/gone/gone.js"], &[]);
    let build = orch.run_to_convergence().unwrap();

    assert!(build.has_errors());
    let error = build.diagnostics.errors().next().unwrap();
    assert_eq!(error.module.as_deref(), Some("pages/gone/gone.js"));
}

#[test]
fn node_modules_packages_are_bundled_into_common() {
    let dir = project(&[
        ("src/app.js", "require('dayjs');\n"),
        ("src/pages/a.js", "require('dayjs');\n"),
        ("node_modules/dayjs/package.json", r#"{ "main": "dayjs.min.js" }"#),
        ("node_modules/dayjs/dayjs.min.js", "module.exports = {};\n"),
    ]);
    let mut orch = orchestrator(dir.path(), &["app.js", "pages/a.js"], &[]);
    orch.run_to_convergence().unwrap();

    assert_eq!(
        orch.compiler().placements()["node_modules/dayjs/dayjs.min.js"],
        "common"
    );
}

#[test]
fn finished_build_writes_output_and_report() {
    let dir = sample_app();
    let mut orch = orchestrator(dir.path(), PAGES, &["pkgA"]);
    let build = orch.run_to_convergence().unwrap();

    let reconciler = AssetReconciler::new(DistPathMapper::default(), ["pages/index/index.wxml"], "app");
    let shell = AppShell {
        descriptor: json!({ "pages": ["pages/index/index"], "subPackages": [{ "root": "pkgA" }] }),
        stylesheets: vec![("main".to_string(), "page {}".to_string())],
        ext_json: None,
    };
    let output = build.finish(&reconciler, &shell, Some(dir.path())).unwrap();

    assert!(output.contains("app.json"));
    assert!(output.contains("app.wxss"));
    assert!(!output.contains("pages/index/index.wxml"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(DEPS_REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(
        report["pkgA/lib/helper.js"],
        json!(["pkgA/pages/a.js", "pkgA/pages/b.js"])
    );
}
