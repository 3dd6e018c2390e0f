//! End-to-end build cycles over the in-memory compiler.

mod helpers;

use std::fs;

use helpers::{INLINE, MemoryCompiler, StaticComponents, orchestrator, touch_all};
use serde_json::json;
use subpack_core::{
    AppShell, AssetReconciler, DEFAULT_GROUP, DEPS_REPORT_FILE, DiagnosticKind, DistPathMapper,
    Error, ModuleId, OrchestratorState, PassScheduler,
};

fn shell() -> AppShell {
    AppShell {
        descriptor: json!({
            "pages": ["pages/index/index"],
            "subPackages": [{ "root": "pkgA", "pages": ["pages/a", "pages/b"] }]
        }),
        stylesheets: vec![("main".to_string(), "page {}".to_string())],
        ext_json: None,
    }
}

fn reconciler() -> AssetReconciler {
    AssetReconciler::new(DistPathMapper::default(), Vec::<String>::new(), "app")
}

#[test]
fn module_used_only_by_one_sub_package_goes_to_its_commons() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = MemoryCompiler::new()
        .import("pkgA/pages/a.js", "shared/util.js")
        .import("pkgA/pages/b.js", "shared/util.js");
    let mut orch = orchestrator(
        dir.path(),
        compiler,
        StaticComponents::new(),
        &["pkgA"],
        &["app.js", "pages/index/index.js", "pkgA/pages/a.js", "pkgA/pages/b.js"],
    );

    let build = orch.run_to_convergence().unwrap();

    assert_eq!(build.passes, 1);
    assert_eq!(orch.compiler().placement("shared/util.js"), Some("pkgA/commonchunks"));
    assert!(build.assets.contains("pkgA/commonchunks.js"));
    assert!(!build.assets.contains("common.js"));
}

#[test]
fn module_shared_with_main_stays_in_the_default_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = MemoryCompiler::new()
        .import("pkgA/pages/a.js", "shared/util.js")
        .import("pages/index/index.js", "shared/util.js");
    let mut orch = orchestrator(
        dir.path(),
        compiler,
        StaticComponents::new(),
        &["pkgA"],
        &["app.js", "pages/index/index.js", "pkgA/pages/a.js"],
    );

    let build = orch.run_to_convergence().unwrap();

    assert_eq!(orch.compiler().placement("shared/util.js"), Some(DEFAULT_GROUP));
    assert!(!build.assets.contains("pkgA/commonchunks.js"));
    let usage = build.usage.usages(&ModuleId::from_relative("shared/util.js").unwrap());
    assert_eq!(usage.len(), 2);
}

#[test]
fn module_shared_between_sub_packages_is_claimed_by_neither() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = MemoryCompiler::new()
        .import("pkgA/pages/a.js", "shared/util.js")
        .import("pkgB/pages/b.js", "shared/util.js")
        .import("pkgB/pages/b.js", "pkgB/lib/only_b.js");
    let mut orch = orchestrator(
        dir.path(),
        compiler,
        StaticComponents::new(),
        &["pkgA", "pkgB"],
        &["app.js", "pkgA/pages/a.js", "pkgB/pages/b.js"],
    );

    orch.run_to_convergence().unwrap();

    assert_eq!(orch.compiler().placement("shared/util.js"), Some(DEFAULT_GROUP));
    assert_eq!(orch.compiler().placement("pkgB/lib/only_b.js"), Some("pkgB/commonchunks"));
}

#[test]
fn discovered_component_converges_after_two_passes() {
    let dir = tempfile::tempdir().unwrap();
    touch_all(dir.path(), &["comp/a.js"]);
    let scanner = StaticComponents::new().uses("pages/index/index.js", "comp/a");
    let mut orch = orchestrator(
        dir.path(),
        MemoryCompiler::new(),
        scanner,
        &[],
        &["app.js", "pages/index/index.js"],
    );

    let first = orch.run_pass().unwrap();
    assert_eq!(first.discovered, vec!["comp/a".to_string()]);
    assert_eq!(orch.pending().len(), 1);
    assert_eq!(orch.decide().unwrap(), OrchestratorState::PassRunning);

    let second = orch.run_pass().unwrap();
    assert!(second.discovered.is_empty());
    assert_eq!(orch.decide().unwrap(), OrchestratorState::Converged);

    assert_eq!(orch.passes(), 2);
    assert_eq!(orch.compiler().entry_counts, vec![2, 3]);
    assert!(orch.entries().get("comp/a").unwrap().is_discovered());
}

#[test]
fn converged_entry_set_is_a_fixed_point() {
    let dir = tempfile::tempdir().unwrap();
    touch_all(dir.path(), &["comp/a.js", "comp/b.js", "comp/c.js"]);
    let scanner = StaticComponents::new()
        .uses("pages/index/index.js", "comp/a")
        .uses("comp/a.js", "comp/b")
        .uses("comp/b.js", "comp/c")
        // a cycle back to an already registered component
        .uses("comp/c.js", "comp/a");
    let mut orch = orchestrator(
        dir.path(),
        MemoryCompiler::new(),
        scanner,
        &[],
        &["app.js", "pages/index/index.js"],
    );

    let build = orch.run_to_convergence().unwrap();
    // three levels of discovery, then one pass that finds nothing new
    assert_eq!(build.passes, 4);
    assert_eq!(build.entries.len(), 5);
    assert_eq!(build.entries.discovered_count(), 3);

    let again = orch.run_to_convergence().unwrap();
    assert_eq!(again.passes, 1);
    assert_eq!(again.entries.len(), 5);
}

#[test]
fn commons_membership_is_recomputed_after_discovery() {
    let dir = tempfile::tempdir().unwrap();
    touch_all(dir.path(), &["comp/banner.js"]);
    let compiler = MemoryCompiler::new()
        .import("pkgA/pages/a.js", "shared/util.js")
        .import("comp/banner.js", "shared/util.js");
    let scanner = StaticComponents::new().uses("pkgA/pages/a.js", "comp/banner");
    let mut orch = orchestrator(
        dir.path(),
        compiler,
        scanner,
        &["pkgA"],
        &["app.js", "pkgA/pages/a.js"],
    );

    orch.run_pass().unwrap();
    assert_eq!(orch.compiler().placement("shared/util.js"), Some("pkgA/commonchunks"));
    assert_eq!(orch.decide().unwrap(), OrchestratorState::PassRunning);

    orch.run_pass().unwrap();
    // now reached from comp/banner.js in the main partition as well
    assert_eq!(orch.compiler().placement("shared/util.js"), Some(DEFAULT_GROUP));
    assert_eq!(orch.decide().unwrap(), OrchestratorState::Converged);
}

#[test]
fn single_use_module_outside_sub_packages_is_inlined() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = MemoryCompiler::new().import("pages/index/index.js", "utils/format.js");
    let mut orch = orchestrator(
        dir.path(),
        compiler,
        StaticComponents::new(),
        &["pkgA"],
        &["app.js", "pages/index/index.js"],
    );

    orch.run_to_convergence().unwrap();
    assert_eq!(orch.compiler().placement("utils/format.js"), Some(INLINE));
}

#[test]
fn missing_component_does_not_block_other_discoveries() {
    let dir = tempfile::tempdir().unwrap();
    touch_all(dir.path(), &["comp/ok.js"]);
    let scanner = StaticComponents::new()
        .uses("pages/index/index.js", "comp/gone")
        .uses("pages/index/index.js", "comp/ok");
    let mut orch = orchestrator(
        dir.path(),
        MemoryCompiler::new(),
        scanner,
        &[],
        &["app.js", "pages/index/index.js"],
    );

    let build = orch.run_to_convergence().unwrap();

    assert_eq!(build.passes, 2);
    assert!(build.entries.contains("comp/ok"));
    let errors: Vec<_> = build.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::Discovery);
}

#[test]
fn successful_cycle_writes_the_report_after_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let compiler = MemoryCompiler::new()
        .import("pkgA/pages/a.js", "shared/util.js")
        .import("pkgA/pages/b.js", "shared/util.js");
    let mut orch = orchestrator(
        dir.path(),
        compiler,
        StaticComponents::new(),
        &["pkgA"],
        &["app.js", "pkgA/pages/a.js", "pkgA/pages/b.js"],
    );

    let build = orch.run_to_convergence().unwrap();
    let output = build
        .finish(&reconciler(), &shell(), Some(dir.path()))
        .unwrap();

    assert!(output.contains("app.json"));
    assert!(output.contains("app.js"));
    assert!(output.contains("app.wxss"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(DEPS_REPORT_FILE)).unwrap())
            .unwrap();
    assert_eq!(
        report["shared/util.js"],
        json!(["pkgA/pages/a.js", "pkgA/pages/b.js"])
    );
}

#[test]
fn missing_app_descriptor_fails_the_cycle_without_a_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut orch = orchestrator(
        dir.path(),
        MemoryCompiler::new(),
        StaticComponents::new(),
        &[],
        &["app.js", "pages/index/index.js"],
    );

    let build = orch.run_to_convergence().unwrap();
    let empty = AppShell {
        descriptor: serde_json::Value::Null,
        ..shell()
    };
    let err = build
        .finish(&reconciler(), &empty, Some(dir.path()))
        .unwrap_err();

    assert!(matches!(err, Error::MissingRequiredAsset { .. }));
    assert!(err.is_invariant_violation());
    assert!(!dir.path().join(DEPS_REPORT_FILE).exists());
}
