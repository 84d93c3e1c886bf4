// tests/closure_narrowing.rs

use std::sync::Arc;

use buildc::dag::{closure_of, narrow, DependencyMap, GraphCompiler};
use buildc::errors::BuildError;
use buildc::fs::mock::MockFileSystem;
use buildc::types::CheckMode;
use buildc_test_utils::builders::recorded_target;
use buildc_test_utils::init_tracing;
use buildc_test_utils::recording::{entries, new_log, recording_registry, ExecLog};

fn forced_compiler(log: &ExecLog) -> GraphCompiler {
    GraphCompiler::new(recording_registry(log))
        .with_filesystem(Arc::new(MockFileSystem::new()))
        .with_check_mode(CheckMode::Force)
}

fn map_of(edges: &[(&str, &[&str])]) -> DependencyMap {
    let mut map = DependencyMap::new();
    for (target, deps) in edges {
        map.insert(*target, deps.iter().map(|d| d.to_string()).collect());
    }
    map
}

#[tokio::test]
async fn test_narrow_builds_only_the_closure() {
    init_tracing();
    let log = new_log();

    let mut full = forced_compiler(&log);
    full.ingest(vec![
        recorded_target("A", &[]),
        recorded_target("B", &["A"]),
        recorded_target("C", &["B"]),
        recorded_target("D", &[]),
    ])
    .unwrap();

    let narrowed = narrow(&full, &["C"]).unwrap();
    let targets: Vec<&str> = narrowed.dependency_map().targets().collect();
    assert_eq!(targets, vec!["A", "B", "C"]);
    assert!(!full.is_finalized());

    assert!(narrowed.run(None).await.unwrap());
    assert_eq!(entries(&log), vec!["A", "B", "C"]);
}

#[test]
fn test_narrow_to_several_targets() {
    let log = new_log();

    let mut full = forced_compiler(&log);
    full.ingest(vec![
        recorded_target("A", &[]),
        recorded_target("B", &["A"]),
        recorded_target("C", &[]),
        recorded_target("D", &["C"]),
        recorded_target("E", &["B", "D"]),
    ])
    .unwrap();

    let narrowed = narrow(&full, &["B", "C"]).unwrap();
    let targets: Vec<&str> = narrowed.dependency_map().targets().collect();
    assert_eq!(targets, vec!["A", "B", "C"]);
    assert_eq!(narrowed.system().unwrap().order(), ["A", "B"]);
}

#[test]
fn test_narrow_unknown_target() {
    let log = new_log();

    let mut full = forced_compiler(&log);
    full.ingest(vec![recorded_target("A", &[])]).unwrap();

    match narrow(&full, &["nope"]) {
        Err(BuildError::UnknownTarget(msg)) => assert!(msg.contains("nope")),
        Err(e) => panic!("Expected UnknownTarget, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_closure_skips_external_inputs() {
    let map = map_of(&[("lib.o", &["lib.c"]), ("app", &["lib.o", "main.c"])]);

    let closure = closure_of(&map, &["app"]).unwrap();
    assert_eq!(closure, vec!["lib.o", "app"]);
}

#[test]
fn test_closure_of_leaf_is_itself() {
    let map = map_of(&[("a", &[]), ("b", &["a"])]);
    assert_eq!(closure_of(&map, &["a"]).unwrap(), vec!["a"]);
}

#[test]
fn test_closure_detects_cycles() {
    let map = map_of(&[("x", &["y"]), ("y", &["z"]), ("z", &["x"]), ("w", &[])]);

    match closure_of(&map, &["x"]) {
        Err(BuildError::CyclicDependency(msg)) => {
            assert!(msg.contains("x -> y -> z -> x"), "unexpected message: {msg}");
        }
        Err(e) => panic!("Expected CyclicDependency, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    // Targets outside the cycle are still reachable.
    assert_eq!(closure_of(&map, &["w"]).unwrap(), vec!["w"]);
}

#[test]
fn test_closure_detects_self_dependency() {
    let map = map_of(&[("loop", &["loop"])]);

    match closure_of(&map, &["loop"]) {
        Err(BuildError::CyclicDependency(_)) => {}
        Err(e) => panic!("Expected CyclicDependency, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}
