// src/dag/closure.rs

//! Dependency closures and narrowed builds.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::dag::compiler::GraphCompiler;
use crate::dag::graph::DependencyMap;
use crate::errors::{BuildError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Every target reachable from `targets` through prerequisites, the
/// requested targets included, in ingestion order.
///
/// External inputs (prerequisites that are not targets) are not part of the
/// closure. Fails with `UnknownTarget` for a requested target missing from
/// `map`, and with `CyclicDependency` if a target reaches itself.
pub fn closure_of<S: AsRef<str>>(map: &DependencyMap, targets: &[S]) -> Result<Vec<String>> {
    for target in targets {
        let target = target.as_ref();
        if !map.contains(target) {
            return Err(BuildError::UnknownTarget(format!(
                "cannot build nonexistent target '{target}'"
            )));
        }
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut visits = 0usize;

    for root in targets {
        let root = root.as_ref();
        if marks.contains_key(root) {
            continue;
        }

        // Each frame is (target, index of the next prerequisite to visit).
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::InProgress);
        visits += 1;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let deps = map.dependencies_of(node);

            if frame.1 >= deps.len() {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            }

            let dep = deps[frame.1].as_str();
            frame.1 += 1;

            if !map.contains(dep) {
                continue;
            }

            match marks.get(dep) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let mut path: Vec<&str> = stack.iter().map(|(name, _)| *name).collect();
                    path.push(dep);
                    return Err(BuildError::CyclicDependency(format!(
                        "target '{dep}' depends on itself: {}",
                        path.join(" -> ")
                    )));
                }
                None => {
                    visits += 1;
                    if visits > map.len() {
                        return Err(BuildError::CyclicDependency(format!(
                            "closure traversal from '{root}' exceeded the graph size"
                        )));
                    }
                    marks.insert(dep, Mark::InProgress);
                    stack.push((dep, 0));
                }
            }
        }
    }

    let closure: Vec<String> = map
        .targets()
        .filter(|target| marks.contains_key(target))
        .map(str::to_string)
        .collect();

    debug!(?closure, "resolved dependency closure");
    Ok(closure)
}

/// Build a compiler for exactly `targets` and their prerequisites.
///
/// The closure's specs are ingested into a fresh compiler (same registry,
/// check mode, filesystem and policy) and finalized through the normal path,
/// so the narrowed schedule is derived from scratch.
pub fn narrow<S: AsRef<str>>(compiler: &GraphCompiler, targets: &[S]) -> Result<GraphCompiler> {
    let closure = closure_of(compiler.dependency_map(), targets)?;
    info!(targets = closure.len(), "narrowing build system to dependency closure");

    let mut narrowed = compiler.fresh();
    let specs = closure
        .iter()
        .filter_map(|target| compiler.spec_for(target).cloned());

    narrowed.ingest(specs)?;
    narrowed.finalize()?;
    Ok(narrowed)
}
