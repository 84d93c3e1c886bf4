// src/dag/mod.rs

//! Dependency graph compilation.
//!
//! - [`graph`] holds the [`DependencyMap`] and its deterministic topological
//!   sort.
//! - [`oracle`] decides per target whether a rebuild is needed.
//! - [`compiler`] ingests specs and finalizes them into a `BuildSystem`.
//! - [`closure`] extracts the dependency closure of some targets and builds
//!   a narrowed compiler for it.

pub mod closure;
pub mod compiler;
pub mod graph;
pub mod oracle;

pub use closure::{closure_of, narrow};
pub use compiler::GraphCompiler;
pub use graph::DependencyMap;
pub use oracle::RebuildOracle;
