// src/dag/compiler.rs

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::build::{BuildSystem, Stage};
use crate::dag::graph::DependencyMap;
use crate::dag::oracle::RebuildOracle;
use crate::errors::{BuildError, Result};
use crate::exec::{build_job, ActionRegistry, Runnable};
use crate::fs::FileSystem;
use crate::spec::{RawJobSpec, Scheduling};
use crate::types::{CheckMode, StageKind, Strictness};

/// A job tracked in the dependency graph.
#[derive(Debug)]
struct GraphTask {
    /// Normalized record, kept so a narrowed compiler can re-ingest it.
    spec: RawJobSpec,
    job: Arc<dyn Runnable>,
    rebuild: bool,
}

/// Compiles job specs into a [`BuildSystem`].
///
/// Specs with a target go into the dependency graph and get a rebuild
/// decision at ingestion. Specs with only a stage name are free tasks: they
/// are collected into always-run stages that follow the graph stages.
///
/// A compiler is single-use: [`GraphCompiler::finalize`] may run once, after
/// which ingestion is refused.
#[derive(Debug)]
pub struct GraphCompiler {
    registry: ActionRegistry,
    oracle: RebuildOracle,
    strictness: Strictness,
    graph: DependencyMap,
    tasks: HashMap<String, GraphTask>,
    free: BuildSystem,
    ingested: usize,
    finalized: bool,
    system: Option<BuildSystem>,
}

impl GraphCompiler {
    /// Create a compiler resolving actions against `registry`, checking
    /// staleness against the real filesystem.
    pub fn new(registry: ActionRegistry) -> Self {
        Self::with_oracle(registry, RebuildOracle::default())
    }

    pub fn with_oracle(registry: ActionRegistry, oracle: RebuildOracle) -> Self {
        info!(actions = registry.len(), mode = %oracle.mode(), "created graph compiler");
        Self {
            registry,
            oracle,
            strictness: Strictness::default(),
            graph: DependencyMap::new(),
            tasks: HashMap::new(),
            free: BuildSystem::new(),
            ingested: 0,
            finalized: false,
            system: None,
        }
    }

    /// Builder: probe mtimes through `fs` instead of the real filesystem.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        let mode = self.oracle.mode();
        self.oracle = RebuildOracle::new(fs).with_mode(mode);
        self
    }

    /// Builder: set the check mode.
    pub fn with_check_mode(mut self, mode: CheckMode) -> Self {
        self.oracle.set_mode(mode);
        self
    }

    /// Builder: default policy for the compiled system.
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self.free.set_strictness(strictness);
        self
    }

    /// Set the check mode from its name.
    ///
    /// Unknown names fail with `InvalidConfiguration`. The mode must be set
    /// before the first spec is ingested, otherwise this fails with
    /// `InvalidState`.
    pub fn set_check_mode(&mut self, mode: &str) -> Result<()> {
        let mode: CheckMode = mode.parse()?;
        if self.ingested > 0 || self.finalized {
            return Err(BuildError::InvalidState(format!(
                "check mode must be set before ingestion ({} specs already ingested)",
                self.ingested
            )));
        }
        self.oracle.set_mode(mode);
        Ok(())
    }

    pub fn check_mode(&self) -> CheckMode {
        self.oracle.mode()
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn oracle(&self) -> &RebuildOracle {
        &self.oracle
    }

    pub fn dependency_map(&self) -> &DependencyMap {
        &self.graph
    }

    /// Rebuild decision recorded for `target` at ingestion.
    pub fn rebuild_needed(&self, target: &str) -> Option<bool> {
        self.tasks.get(target).map(|task| task.rebuild)
    }

    /// The normalized spec ingested for `target`.
    pub fn spec_for(&self, target: &str) -> Option<&RawJobSpec> {
        self.tasks.get(target).map(|task| &task.spec)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The compiled system, once finalized.
    pub fn system(&self) -> Option<&BuildSystem> {
        self.system.as_ref()
    }

    pub fn system_mut(&mut self) -> Option<&mut BuildSystem> {
        self.system.as_mut()
    }

    pub fn into_system(self) -> Option<BuildSystem> {
        self.system
    }

    /// An empty compiler sharing this one's registry, oracle and policy.
    pub fn fresh(&self) -> Self {
        Self::with_oracle(self.registry.clone(), self.oracle.clone())
            .with_strictness(self.strictness)
    }

    /// Ingest specs in order. Returns how many were ingested.
    pub fn ingest<I>(&mut self, specs: I) -> Result<usize>
    where
        I: IntoIterator<Item = RawJobSpec>,
    {
        let mut count = 0;
        for spec in specs {
            self.ingest_one(spec)?;
            count += 1;
        }
        debug!(count, "ingested job specs");
        Ok(count)
    }

    /// Classify one spec and record it as a graph task or a free task.
    ///
    /// Target names and free stage names share one namespace: a name used
    /// by both fails with `InvalidJob`, in either ingestion order.
    pub fn ingest_one(&mut self, spec: RawJobSpec) -> Result<()> {
        if self.finalized {
            return Err(BuildError::AlreadyFinalized);
        }

        let classified = spec.classify()?;
        let job = build_job(&classified.job, &self.registry)?;

        match classified.scheduling {
            Scheduling::Target { name, deps } => {
                if self.graph.contains(&name) {
                    return Err(BuildError::InvalidJob(format!(
                        "target '{name}' is declared more than once"
                    )));
                }
                if self.free.contains(&name) {
                    return Err(BuildError::InvalidJob(format!(
                        "target '{name}' has the same name as a free stage"
                    )));
                }

                let rebuild = self.oracle.decide(&name, &deps);
                if rebuild {
                    info!(target = %name, ?deps, "target is stale; adding to build queue");
                } else {
                    info!(target = %name, "rebuild not needed");
                }

                self.graph.insert(name.clone(), deps);
                self.tasks.insert(name, GraphTask { spec, job, rebuild });
            }
            Scheduling::Stage(stage) => {
                // Graph stages are named after targets.
                if self.graph.contains(&stage) {
                    return Err(BuildError::InvalidJob(format!(
                        "free stage '{stage}' has the same name as a target"
                    )));
                }
                debug!(stage = %stage, job = %job.describe(), "adding free job to stage");
                self.free.add_job(&stage, job)?;
            }
        }

        self.ingested += 1;
        Ok(())
    }

    /// Compile the ingested specs into a closed [`BuildSystem`].
    ///
    /// - No graph tasks: the free stages are the system (`EmptySystem` if
    ///   there are none).
    /// - Otherwise graph tasks are ordered topologically. Targets before the
    ///   first stale one are dropped; from the first stale target on, every
    ///   target is rebuilt. Consecutive targets are grouped into one parallel
    ///   stage until a target depends directly on a member of the current
    ///   group. Free stages follow the graph stages.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(BuildError::AlreadyFinalized);
        }
        self.finalized = true;

        let free = mem::take(&mut self.free);

        let mut system = if self.graph.is_empty() {
            debug!("no dependency tasks; using free stages only");
            if free.is_empty() {
                return Err(BuildError::EmptySystem);
            }
            let mut system = BuildSystem::with_strictness(self.strictness);
            system.extend(free);
            system
        } else {
            let order = self.graph.topological_order()?;
            debug!(?order, "sorted dependency graph");

            let mut system = self.compile_graph_stages(&order)?;

            if system.is_empty() && free.is_empty() {
                warn!("no target needs rebuilding and there are no free stages");
                return Err(BuildError::EmptySystem);
            }

            if !free.is_empty() {
                info!(stages = free.count(), "adding free stages after dependency stages");
                system.extend(free);
            }
            system
        };

        system.close();
        info!(stages = ?system.order(), "finalized build system");
        self.system = Some(system);
        Ok(())
    }

    fn compile_graph_stages(&self, order: &[String]) -> Result<BuildSystem> {
        let mut system = BuildSystem::with_strictness(self.strictness);
        let mut rebuild_needed = false;
        let mut group: Vec<&str> = Vec::new();

        for target in order {
            let Some(task) = self.tasks.get(target) else {
                return Err(BuildError::InvalidSystem(format!(
                    "target '{target}' is in the graph but has no job"
                )));
            };

            if !rebuild_needed {
                if !task.rebuild {
                    debug!(target = %target, "does not need a rebuild; dropping");
                    continue;
                }
                debug!(target = %target, "first stale target; rebuilding everything after it");
                rebuild_needed = true;
            }

            let depends_on_group = group.iter().any(|member| self.graph.depends_on(target, member));
            if depends_on_group {
                self.emit_stage(&mut system, &group)?;
                group.clear();
            }
            group.push(target);
        }

        if !group.is_empty() {
            self.emit_stage(&mut system, &group)?;
        }

        Ok(system)
    }

    fn emit_stage(&self, system: &mut BuildSystem, group: &[&str]) -> Result<()> {
        let Some(name) = group.first() else {
            return Ok(());
        };

        let mut stage = Stage::parallel();
        for target in group {
            if let Some(task) = self.tasks.get(*target) {
                stage.add(Arc::clone(&task.job))?;
            }
        }

        debug!(stage = %name, targets = ?group, "adding dependency stage");
        system.add_stage(*name, Some(stage), StageKind::Parallel, Some(Strictness::Strict))?;
        Ok(())
    }

    /// Run the compiled system.
    pub async fn run(&self, strict: Option<Strictness>) -> Result<bool> {
        match &self.system {
            Some(system) => system.run(strict).await,
            None => Err(BuildError::InvalidState(
                "graph compiler must be finalized before running".to_string(),
            )),
        }
    }
}
