// tests/property_scheduling.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use buildc::dag::{closure_of, DependencyMap, GraphCompiler};
use buildc::fs::mock::MockFileSystem;
use buildc::spec::RawJobSpec;
use buildc::types::CheckMode;
use buildc_test_utils::builders::recorded_target;
use buildc_test_utils::recording::{entries, new_log, recording_registry};
use proptest::prelude::*;

// Strategy to generate a random DAG as (name, deps) pairs.
// Acyclicity: task N may only depend on tasks 0..N-1. The list is then
// reversed so ingestion order differs from dependency order.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw_deps| {
            let mut tasks: Vec<(String, Vec<String>)> = raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let deps: HashSet<usize> = if i == 0 {
                        HashSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };
                    let mut deps: Vec<String> =
                        deps.into_iter().map(|d| format!("task_{d}")).collect();
                    deps.sort();
                    (format!("task_{i}"), deps)
                })
                .collect();
            tasks.reverse();
            tasks
        })
    })
}

fn specs_of(tasks: &[(String, Vec<String>)]) -> Vec<RawJobSpec> {
    tasks
        .iter()
        .map(|(name, deps)| {
            let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
            recorded_target(name, &deps)
        })
        .collect()
}

fn map_of(tasks: &[(String, Vec<String>)]) -> DependencyMap {
    let mut map = DependencyMap::new();
    for (name, deps) in tasks {
        map.insert(name.clone(), deps.clone());
    }
    map
}

proptest! {
    #[test]
    fn test_topological_order_respects_dependencies(tasks in dag_strategy(12)) {
        let map = map_of(&tasks);
        let order = map.topological_order().unwrap();
        prop_assert_eq!(order.len(), tasks.len());

        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
        for (name, deps) in &tasks {
            for dep in deps {
                prop_assert!(position[dep.as_str()] < position[name.as_str()]);
            }
        }
    }

    #[test]
    fn test_closure_is_dependency_closed(tasks in dag_strategy(12), pick in any::<usize>()) {
        let map = map_of(&tasks);
        let root = &tasks[pick % tasks.len()].0;

        let closure = closure_of(&map, &[root.as_str()]).unwrap();
        prop_assert!(closure.contains(root));

        let members: HashSet<&str> = closure.iter().map(String::as_str).collect();
        for member in &closure {
            for dep in map.dependencies_of(member) {
                prop_assert!(members.contains(dep.as_str()));
            }
        }
    }

    #[test]
    fn test_forced_build_runs_everything_in_dependency_order(tasks in dag_strategy(10)) {
        let log = new_log();
        let mut compiler = GraphCompiler::new(recording_registry(&log))
            .with_filesystem(Arc::new(MockFileSystem::new()))
            .with_check_mode(CheckMode::Force);
        compiler.ingest(specs_of(&tasks)).unwrap();
        compiler.finalize().unwrap();

        let system = compiler.system().unwrap();
        let jobs: usize = system.iter().map(|(_, stage)| stage.len()).sum();
        prop_assert_eq!(jobs, tasks.len());
        prop_assert!(system.count() <= tasks.len());

        let rt = tokio::runtime::Runtime::new().unwrap();
        let success = rt.block_on(compiler.run(None)).unwrap();
        prop_assert!(success);

        let ran = entries(&log);
        prop_assert_eq!(ran.len(), tasks.len());
        let position: HashMap<&str, usize> =
            ran.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
        for (name, deps) in &tasks {
            for dep in deps {
                prop_assert!(position[dep.as_str()] < position[name.as_str()]);
            }
        }
    }
}
