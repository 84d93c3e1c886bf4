// tests/graph_compiler.rs

use std::sync::Arc;

use buildc::dag::GraphCompiler;
use buildc::errors::BuildError;
use buildc::fs::mock::MockFileSystem;
use buildc::types::CheckMode;
use buildc_test_utils::builders::{recorded_stage_job, recorded_target, SpecBuilder};
use buildc_test_utils::init_tracing;
use buildc_test_utils::recording::{entries, new_log, recording_registry, ExecLog};
use serde_json::json;

fn compiler(log: &ExecLog, fs: &MockFileSystem, mode: CheckMode) -> GraphCompiler {
    GraphCompiler::new(recording_registry(log))
        .with_filesystem(Arc::new(fs.clone()))
        .with_check_mode(mode)
}

#[tokio::test]
async fn test_staleness_propagates_forward() {
    init_tracing();
    let log = new_log();
    let fs = MockFileSystem::new();
    // A is fresh, B is older than A, C is fresh on its own.
    fs.touch("src.a", 10);
    fs.touch("A", 20);
    fs.touch("B", 5);
    fs.touch("C", 30);

    let mut c = compiler(&log, &fs, CheckMode::Mtime);
    c.ingest(vec![
        recorded_target("A", &["src.a"]),
        recorded_target("B", &["A"]),
        recorded_target("C", &["B"]),
    ])
    .unwrap();

    assert_eq!(c.rebuild_needed("A"), Some(false));
    assert_eq!(c.rebuild_needed("B"), Some(true));
    assert_eq!(c.rebuild_needed("C"), Some(false));

    c.finalize().unwrap();
    let system = c.system().unwrap();
    assert!(system.is_closed());
    assert_eq!(system.order(), ["B", "C"]);

    assert!(c.run(None).await.unwrap());
    assert_eq!(entries(&log), vec!["B", "C"]);
}

#[test]
fn test_everything_fresh_is_an_empty_system() {
    let log = new_log();
    let fs = MockFileSystem::new();
    fs.touch("in", 1);
    fs.touch("out", 2);

    let mut c = compiler(&log, &fs, CheckMode::Mtime);
    c.ingest(vec![recorded_target("out", &["in"])]).unwrap();

    match c.finalize() {
        Err(BuildError::EmptySystem) => {}
        Err(e) => panic!("Expected EmptySystem, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_no_specs_is_an_empty_system() {
    let log = new_log();
    let fs = MockFileSystem::new();
    let mut c = compiler(&log, &fs, CheckMode::Force);

    match c.finalize() {
        Err(BuildError::EmptySystem) => {}
        Err(e) => panic!("Expected EmptySystem, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_independent_targets_share_a_stage() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![
        recorded_target("A", &[]),
        recorded_target("B", &[]),
        recorded_target("C", &[]),
        recorded_target("D", &["A"]),
    ])
    .unwrap();
    c.finalize().unwrap();

    let system = c.system().unwrap();
    assert_eq!(system.order(), ["A", "D"]);
    assert_eq!(system.stage("A").unwrap().len(), 3);
    assert_eq!(system.stage("D").unwrap().len(), 1);
}

#[test]
fn test_chain_gets_one_stage_per_target() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    // Ingested out of order on purpose.
    c.ingest(vec![
        recorded_target("C", &["B"]),
        recorded_target("B", &["A"]),
        recorded_target("A", &[]),
    ])
    .unwrap();
    c.finalize().unwrap();

    assert_eq!(c.system().unwrap().order(), ["A", "B", "C"]);
}

#[test]
fn test_external_inputs_do_not_order_targets() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![
        recorded_target("x.o", &["x.c", "common.h"]),
        recorded_target("y.o", &["y.c", "common.h"]),
    ])
    .unwrap();
    c.finalize().unwrap();

    let system = c.system().unwrap();
    assert_eq!(system.order(), ["x.o"]);
    assert_eq!(system.stage("x.o").unwrap().len(), 2);
}

#[tokio::test]
async fn test_free_stages_run_after_graph_stages() {
    init_tracing();
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![
        recorded_stage_job("post", "post-1"),
        recorded_target("T", &[]),
        recorded_stage_job("post", "post-2"),
        recorded_stage_job("docs", "docs"),
    ])
    .unwrap();
    c.finalize().unwrap();

    let system = c.system().unwrap();
    assert_eq!(system.order(), ["T", "post", "docs"]);
    assert_eq!(system.stage("post").unwrap().len(), 2);

    assert!(c.run(None).await.unwrap());
    let ran = entries(&log);
    assert_eq!(ran[0], "T");
    assert_eq!(ran.len(), 4);
    assert_eq!(ran[3], "docs");
}

#[test]
fn test_free_stages_survive_fresh_graph() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Ignore);
    c.ingest(vec![
        recorded_target("T", &[]),
        recorded_stage_job("always", "always"),
    ])
    .unwrap();
    c.finalize().unwrap();

    assert_eq!(c.system().unwrap().order(), ["always"]);
}

#[test]
fn test_free_only_input() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Mtime);
    c.ingest(vec![
        recorded_stage_job("one", "1"),
        SpecBuilder::new().job("record").args(json!(["loose"])).build(),
    ])
    .unwrap();
    c.finalize().unwrap();

    assert_eq!(c.system().unwrap().order(), ["one", "__unspecified"]);
}

#[test]
fn test_stage_with_dependencies_becomes_a_target() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![SpecBuilder::stage("generated.rs")
        .deps_str("schema.json templates.txt")
        .job("record")
        .args(json!(["gen"]))
        .build()])
        .unwrap();

    let map = c.dependency_map();
    assert!(map.contains("generated.rs"));
    assert_eq!(
        map.dependencies_of("generated.rs"),
        ["schema.json", "templates.txt"]
    );
}

#[test]
fn test_finalize_is_single_use() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![recorded_target("A", &[])]).unwrap();
    c.finalize().unwrap();
    assert!(c.is_finalized());

    match c.finalize() {
        Err(BuildError::AlreadyFinalized) => {}
        Err(e) => panic!("Expected AlreadyFinalized, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    match c.ingest_one(recorded_target("B", &[])) {
        Err(BuildError::AlreadyFinalized) => {}
        Err(e) => panic!("Expected AlreadyFinalized, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[tokio::test]
async fn test_run_before_finalize() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![recorded_target("A", &[])]).unwrap();

    match c.run(None).await {
        Err(BuildError::InvalidState(_)) => {}
        Err(e) => panic!("Expected InvalidState, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_duplicate_target_is_rejected() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    let result = c.ingest(vec![recorded_target("A", &[]), recorded_target("A", &["x"])]);

    match result {
        Err(BuildError::InvalidJob(msg)) => assert!(msg.contains("'A'")),
        Err(e) => panic!("Expected InvalidJob, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_action_lists_available_names() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    let spec = SpecBuilder::target("A").job("compile").build();

    match c.ingest_one(spec) {
        Err(BuildError::InvalidJob(msg)) => {
            assert!(msg.contains("compile"));
            assert!(msg.contains("record"));
            assert!(msg.contains("fail"));
        }
        Err(e) => panic!("Expected InvalidJob, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_malformed_specs_are_rejected() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut both = SpecBuilder::target("A").job("record").build();
    both.stage = Some("s".to_string());

    let bad = vec![
        both,
        // scalar args
        SpecBuilder::target("A").job("record").args(json!(42)).build(),
        // dependencies with nowhere to go
        SpecBuilder::new().dep("x").cmd("true").build(),
        // both an action and a command
        SpecBuilder::target("A").job("record").cmd("true").build(),
        // nothing to run
        SpecBuilder::target("A").build(),
    ];

    for spec in bad {
        let mut c = compiler(&log, &fs, CheckMode::Force);
        match c.ingest_one(spec.clone()) {
            Err(BuildError::InvalidJob(_)) => {}
            Err(e) => panic!("Expected InvalidJob for {:?}, got: {:?}", spec, e),
            Ok(_) => panic!("Expected error for {:?}, got Ok", spec),
        }
    }
}

#[test]
fn test_cycle_fails_at_finalize() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![
        recorded_target("A", &["B"]),
        recorded_target("B", &["A"]),
    ])
    .unwrap();

    match c.finalize() {
        Err(BuildError::CyclicDependency(msg)) => {
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected CyclicDependency, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_check_mode_must_precede_ingestion() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Mtime);
    match c.set_check_mode("often") {
        Err(BuildError::InvalidConfiguration(_)) => {}
        Err(e) => panic!("Expected InvalidConfiguration, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    c.set_check_mode("force").unwrap();
    assert_eq!(c.check_mode(), CheckMode::Force);

    c.ingest(vec![recorded_target("A", &[])]).unwrap();
    match c.set_check_mode("ignore") {
        Err(BuildError::InvalidState(_)) => {}
        Err(e) => panic!("Expected InvalidState, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
    assert_eq!(c.check_mode(), CheckMode::Force);
}

#[tokio::test]
async fn test_failing_action_fails_the_build_without_error() {
    init_tracing();
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![
        recorded_target("A", &[]),
        SpecBuilder::target("B")
            .dep("A")
            .job("fail")
            .args(json!(["B"]))
            .build(),
        recorded_target("C", &["B"]),
    ])
    .unwrap();
    c.finalize().unwrap();

    assert!(!c.run(None).await.unwrap());
    assert_eq!(entries(&log), vec!["A", "B"]);
}

#[tokio::test]
async fn test_sequence_jobs_run_in_order() {
    init_tracing();
    let log = new_log();
    let fs = MockFileSystem::new();

    let step = |label: &str| {
        SpecBuilder::new()
            .job("record")
            .args(json!([label]))
            .build()
    };

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![SpecBuilder::target("bundle")
        .tasks(vec![step("one"), step("two"), step("three")])
        .build()])
        .unwrap();
    c.finalize().unwrap();

    assert!(c.run(None).await.unwrap());
    assert_eq!(entries(&log), vec!["one", "two", "three"]);
}

#[test]
fn test_free_stage_cannot_share_a_target_name() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest_one(recorded_target("test", &[])).unwrap();

    match c.ingest_one(recorded_stage_job("test", "free-test")) {
        Err(BuildError::InvalidJob(msg)) => assert!(msg.contains("'test'")),
        Err(e) => panic!("Expected InvalidJob, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_target_cannot_share_a_free_stage_name() {
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest_one(recorded_stage_job("test", "free-test")).unwrap();

    match c.ingest_one(recorded_target("test", &[])) {
        Err(BuildError::InvalidJob(msg)) => assert!(msg.contains("'test'")),
        Err(e) => panic!("Expected InvalidJob, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    // A stage with dependencies is a target too.
    let promoted = SpecBuilder::stage("test")
        .deps_str("input.txt")
        .job("record")
        .args(json!(["promoted"]))
        .build();
    match c.ingest_one(promoted) {
        Err(BuildError::InvalidJob(_)) => {}
        Err(e) => panic!("Expected InvalidJob, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[tokio::test]
async fn test_graph_and_free_jobs_both_run() {
    init_tracing();
    let log = new_log();
    let fs = MockFileSystem::new();

    let mut c = compiler(&log, &fs, CheckMode::Force);
    c.ingest(vec![
        recorded_target("test", &[]),
        recorded_stage_job("check", "free-check"),
    ])
    .unwrap();
    c.finalize().unwrap();

    assert_eq!(c.system().unwrap().order(), ["test", "check"]);
    assert!(c.run(None).await.unwrap());
    assert_eq!(entries(&log), vec!["test", "free-check"]);
}
