// src/build/system.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::build::stage::Stage;
use crate::errors::{BuildError, Result};
use crate::exec::Runnable;
use crate::types::{StageKind, Strictness};

/// An ordered, named collection of stages, executed one after another.
///
/// A system starts *open*: stages may be added. [`BuildSystem::close`] makes
/// it runnable. Under [`Strictness::Strict`] adding to a closed system or
/// running an open one is an error; under [`Strictness::Permissive`] both are
/// allowed with a warning.
///
/// Every method that enforces a policy takes an `Option<Strictness>`; `None`
/// means "use this system's default".
#[derive(Debug, Default)]
pub struct BuildSystem {
    /// Stage names in execution order.
    order: Vec<String>,
    stages: HashMap<String, Stage>,
    closed: bool,
    strictness: Strictness,
}

impl BuildSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strictness(strictness: Strictness) -> Self {
        Self {
            strictness,
            ..Self::default()
        }
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn set_strictness(&mut self, strictness: Strictness) {
        info!(?strictness, "changing default build system strictness");
        self.strictness = strictness;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stage names in the order they run.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    pub fn stage_mut(&mut self, name: &str) -> Option<&mut Stage> {
        self.stages.get_mut(name)
    }

    /// Position of `name` in the run order.
    pub fn stage_index(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|s| s == name)
    }

    /// Iterate `(name, stage)` pairs in run order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stage)> {
        self.order
            .iter()
            .filter_map(|name| self.stages.get(name).map(|stage| (name.as_str(), stage)))
    }

    /// Register a stage under `name`.
    ///
    /// If `stage` is `None`, an empty stage of `kind` is created.
    ///
    /// Returns `Ok(false)` in permissive mode when the name is already taken.
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        stage: Option<Stage>,
        kind: StageKind,
        strict: Option<Strictness>,
    ) -> Result<bool> {
        let name = name.into();

        if self.closed {
            self.error_or_return(
                BuildError::InvalidState(format!(
                    "cannot add stage '{name}' to a closed build system"
                )),
                strict,
            )?;
            warn!(stage = %name, "adding stage to a closed build system in permissive mode");
        }

        if self.stages.contains_key(&name) {
            return self.error_or_return(BuildError::DuplicateStage(name), strict);
        }

        let stage = stage.unwrap_or_else(|| {
            debug!(stage = %name, %kind, "creating new empty stage");
            Stage::new(kind)
        });

        debug!(stage = %name, kind = %stage.kind(), jobs = stage.len(), "adding stage");
        self.order.push(name.clone());
        self.stages.insert(name, stage);
        Ok(true)
    }

    /// Add an empty stage of `kind` named `name`.
    pub fn new_stage(&mut self, name: impl Into<String>, kind: StageKind) -> Result<bool> {
        self.add_stage(name, None, kind, None)
    }

    /// Add `job` to the stage `name`, creating a parallel stage on first use.
    pub fn add_job(&mut self, name: &str, job: Arc<dyn Runnable>) -> Result<()> {
        if !self.stages.contains_key(name) {
            self.new_stage(name, StageKind::Parallel)?;
        }
        match self.stages.get_mut(name) {
            Some(stage) => stage.add(job),
            None => Err(BuildError::InvalidSystem(format!(
                "stage '{name}' could not be created"
            ))),
        }
    }

    /// Close the system. Closing twice only logs a warning.
    pub fn close(&mut self) {
        if self.closed {
            warn!("cannot close build system a second time");
        } else {
            info!(stages = ?self.order, "closing build system");
            self.closed = true;
        }
    }

    /// Merge `other` into this system.
    ///
    /// On a name collision the incoming stage replaces the existing one but
    /// keeps the existing position; new names are appended in `other`'s order.
    pub fn extend(&mut self, other: BuildSystem) {
        let BuildSystem {
            order, mut stages, ..
        } = other;

        for name in order {
            let Some(stage) = stages.remove(&name) else {
                continue;
            };
            if self.stages.insert(name.clone(), stage).is_some() {
                warn!(stage = %name, "extending build system: incoming stage replaces existing one");
            } else {
                debug!(stage = %name, "extending build system");
                self.order.push(name);
            }
        }
    }

    /// Cap concurrently running jobs across all parallel stages at `n`.
    pub fn set_workers(&mut self, n: usize) {
        let n = n.max(1);
        info!(workers = n, "limiting parallel jobs");
        let sem = Arc::new(Semaphore::new(n));
        for stage in self.stages.values_mut() {
            stage.set_workers(Arc::clone(&sem));
        }
    }

    /// Run every stage in order.
    ///
    /// Stops at the first failing stage and returns `Ok(false)`; otherwise
    /// returns the last stage's result. Policy violations (open system,
    /// unclosed sequential stage) are errors under strict mode.
    pub async fn run(&self, strict: Option<Strictness>) -> Result<bool> {
        info!(stages = self.count(), "running entire build system");
        self.run_indices(0..self.count(), strict).await
    }

    /// Run stages `start..=stop` without re-checking dependencies.
    ///
    /// Used for partial or resumed builds.
    pub async fn run_range(
        &self,
        start: usize,
        stop: usize,
        strict: Option<Strictness>,
    ) -> Result<bool> {
        if start > stop || stop >= self.count() {
            return self.error_or_return(
                BuildError::RangeError {
                    start,
                    stop,
                    len: self.count(),
                },
                strict,
            );
        }

        debug!(start, stop, "running stage range, not checking dependencies");
        self.run_indices(start..stop + 1, strict).await
    }

    /// Run the single stage `name`.
    pub async fn run_stage(&self, name: &str, strict: Option<Strictness>) -> Result<bool> {
        match self.stage_index(name) {
            Some(idx) => self.run_indices(idx..idx + 1, strict).await,
            None => self.error_or_return(
                BuildError::InvalidStage(format!("stage '{name}' must exist to run")),
                strict,
            ),
        }
    }

    async fn run_indices(
        &self,
        range: std::ops::Range<usize>,
        strict: Option<Strictness>,
    ) -> Result<bool> {
        self.check_runnable(strict)?;

        let mut ret = true;
        for name in &self.order[range] {
            let Some(stage) = self.stages.get(name) else {
                return Err(BuildError::InvalidSystem(format!(
                    "stage '{name}' is in the run order but not registered"
                )));
            };

            info!(stage = %name, kind = %stage.kind(), jobs = stage.len(), "running build stage");
            ret = stage.execute().await;
            info!(stage = %name, success = ret, "completed build stage");

            if !ret {
                error!(stage = %name, "stage failed; stopping build");
                return Ok(false);
            }
        }

        Ok(ret)
    }

    fn check_runnable(&self, strict: Option<Strictness>) -> Result<()> {
        if !self.closed {
            self.error_or_return(BuildError::NotClosed, strict)?;
            warn!("running an open build system in permissive mode");
        }

        for (name, stage) in self.iter() {
            if !stage.is_closed() {
                self.error_or_return(
                    BuildError::InvalidState(format!("sequential stage '{name}' is not closed")),
                    strict,
                )?;
                warn!(stage = %name, "running an unclosed sequential stage in permissive mode");
            }
        }

        Ok(())
    }

    /// Raise `err` under strict mode; otherwise log it and return `Ok(false)`.
    fn error_or_return(&self, err: BuildError, strict: Option<Strictness>) -> Result<bool> {
        let strict = strict.unwrap_or(self.strictness);
        if strict.is_strict() {
            error!(error = %err, "strict mode violation");
            Err(err)
        } else {
            warn!(error = %err, "permissive mode; continuing");
            Ok(false)
        }
    }

    /// One line per stage, for dry runs.
    pub fn describe(&self) -> Vec<String> {
        self.iter()
            .enumerate()
            .map(|(idx, (name, stage))| {
                format!("{idx}: {name} ({}) {}", stage.kind(), stage.describe())
            })
            .collect()
    }
}
