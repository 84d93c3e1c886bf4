// src/dag/graph.rs

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{BuildError, Result};

/// Target → prerequisites, in ingestion order.
///
/// Prerequisites that are not themselves targets in the map are external
/// inputs (usually source files). They matter to the rebuild oracle but
/// impose no ordering.
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    targets: Vec<String>,
    index: HashMap<String, usize>,
    deps: Vec<Vec<String>>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `target` with its prerequisites.
    ///
    /// Returns `false` (and changes nothing) if the target is already known.
    pub fn insert(&mut self, target: impl Into<String>, deps: Vec<String>) -> bool {
        let target = target.into();
        if self.index.contains_key(&target) {
            return false;
        }
        self.index.insert(target.clone(), self.targets.len());
        self.targets.push(target);
        self.deps.push(deps);
        true
    }

    pub fn contains(&self, target: &str) -> bool {
        self.index.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// All targets in ingestion order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    /// Ingestion position of `target`.
    pub fn position(&self, target: &str) -> Option<usize> {
        self.index.get(target).copied()
    }

    /// Declared prerequisites of `target`, including external inputs.
    pub fn dependencies_of(&self, target: &str) -> &[String] {
        self.position(target)
            .map(|idx| self.deps[idx].as_slice())
            .unwrap_or(&[])
    }

    /// Whether `target` lists `dep` as a direct prerequisite.
    pub fn depends_on(&self, target: &str, dep: &str) -> bool {
        self.dependencies_of(target).iter().any(|d| d == dep)
    }

    /// Build a petgraph graph over the targets.
    ///
    /// Node `i` is the `i`-th ingested target. Edge direction is
    /// prerequisite → dependent; external inputs get no node.
    fn to_graph(&self) -> DiGraph<&str, ()> {
        let mut graph = DiGraph::with_capacity(self.targets.len(), 0);
        for target in &self.targets {
            graph.add_node(target.as_str());
        }

        for (idx, deps) in self.deps.iter().enumerate() {
            for dep in deps {
                if let Some(&dep_idx) = self.index.get(dep) {
                    graph.add_edge(NodeIndex::new(dep_idx), NodeIndex::new(idx), ());
                }
            }
        }

        graph
    }

    /// Deterministic topological order of all targets.
    ///
    /// Kahn's algorithm; among targets whose prerequisites are all placed,
    /// the earliest ingested goes first. Fails with `CyclicDependency` if the
    /// map has a cycle.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let graph = self.to_graph();

        // A topological sort will fail if there is a cycle.
        if let Err(cycle) = toposort(&graph, None) {
            let node = graph[cycle.node_id()];
            return Err(BuildError::CyclicDependency(format!(
                "cycle detected in dependency graph involving target '{node}'"
            )));
        }

        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(self.targets.len());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(self.targets[idx].clone());
            for next in graph.neighbors_directed(NodeIndex::new(idx), Direction::Outgoing) {
                let slot = &mut in_degree[next.index()];
                *slot -= 1;
                if *slot == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }

        if order.len() != self.targets.len() {
            return Err(BuildError::CyclicDependency(
                "dependency graph could not be fully ordered".to_string(),
            ));
        }

        Ok(order)
    }
}
