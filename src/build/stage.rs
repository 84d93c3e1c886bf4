// src/build/stage.rs

//! Stages: named groups of jobs, run either concurrently or in order.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::errors::{BuildError, Result};
use crate::exec::{BoxFuture, Runnable};
use crate::types::StageKind;

/// An executable group of jobs.
///
/// - A *parallel* stage starts every job, waits for all of them, and succeeds
///   iff all succeeded. A failing job does not stop its siblings.
/// - A *sequential* stage runs jobs one at a time in insertion order and
///   stops at the first failure. It must be closed before a strict build
///   will run it.
pub struct Stage {
    kind: StageKind,
    jobs: Vec<Arc<dyn Runnable>>,
    closed: bool,
    /// Shared cap on concurrently running jobs (parallel stages only).
    workers: Option<Arc<Semaphore>>,
}

impl Stage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            jobs: Vec::new(),
            closed: false,
            workers: None,
        }
    }

    pub fn parallel() -> Self {
        Self::new(StageKind::Parallel)
    }

    pub fn sequential() -> Self {
        Self::new(StageKind::Sequential)
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> &[Arc<dyn Runnable>] {
        &self.jobs
    }

    /// Whether the stage is complete and may take part in a strict build.
    ///
    /// Parallel stages are always ready.
    pub fn is_closed(&self) -> bool {
        match self.kind {
            StageKind::Parallel => true,
            StageKind::Sequential => self.closed,
        }
    }

    /// Append a job. Fails with `InvalidState` on a closed sequential stage.
    pub fn add(&mut self, job: Arc<dyn Runnable>) -> Result<()> {
        if self.kind == StageKind::Sequential && self.closed {
            return Err(BuildError::InvalidState(format!(
                "cannot add '{}' to a closed sequential stage",
                job.describe()
            )));
        }
        self.jobs.push(job);
        Ok(())
    }

    /// Mark the stage complete.
    ///
    /// Closing a sequential stage twice fails with `InvalidState`; for a
    /// parallel stage this is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.kind {
            StageKind::Parallel => Ok(()),
            StageKind::Sequential if self.closed => Err(BuildError::InvalidState(
                "sequential stage is already closed".to_string(),
            )),
            StageKind::Sequential => {
                self.closed = true;
                Ok(())
            }
        }
    }

    /// Limit how many jobs of this stage may run at once.
    ///
    /// The semaphore can be shared across stages. Ignored by sequential
    /// stages, which only ever run one job.
    pub fn set_workers(&mut self, workers: Arc<Semaphore>) {
        self.workers = Some(workers);
    }

    /// Run the stage and report success.
    pub async fn execute(&self) -> bool {
        match self.kind {
            StageKind::Parallel => self.run_parallel().await,
            StageKind::Sequential => self.run_sequential().await,
        }
    }

    async fn run_sequential(&self) -> bool {
        for (idx, job) in self.jobs.iter().enumerate() {
            debug!(job = %job.describe(), position = idx, "running sequential job");
            if !job.run().await {
                warn!(
                    job = %job.describe(),
                    remaining = self.jobs.len() - idx - 1,
                    "sequential job failed; aborting the rest of the sequence"
                );
                return false;
            }
        }
        true
    }

    async fn run_parallel(&self) -> bool {
        let mut set = JoinSet::new();

        for job in &self.jobs {
            let job = Arc::clone(job);
            let workers = self.workers.clone();
            set.spawn(async move {
                let _permit = match workers {
                    Some(sem) => match sem.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return false,
                    },
                    None => None,
                };
                job.run().await
            });
        }

        let mut success = true;
        while let Some(res) = set.join_next().await {
            match res {
                Ok(true) => {}
                Ok(false) => success = false,
                Err(err) => {
                    error!(error = %err, "parallel job panicked");
                    success = false;
                }
            }
        }

        if !success {
            warn!(jobs = self.jobs.len(), "parallel stage finished with failures");
        }
        success
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::parallel()
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("kind", &self.kind)
            .field("jobs", &self.jobs)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Runnable for Stage {
    fn run(&self) -> BoxFuture<'_, bool> {
        Box::pin(self.execute())
    }

    fn describe(&self) -> String {
        let inner: Vec<String> = self.jobs.iter().map(|job| job.describe()).collect();
        match self.kind {
            StageKind::Parallel => format!("{{{}}}", inner.join(" | ")),
            StageKind::Sequential => format!("[{}]", inner.join("; ")),
        }
    }
}
