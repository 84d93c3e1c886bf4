// src/exec/mod.rs

//! Job execution layer.
//!
//! Everything a stage can hold implements [`Runnable`]: a job that reports
//! plain success or failure. Failures are `false`, never errors.
//!
//! - [`action`] holds the action registry and [`ActionJob`], which calls a
//!   registered Rust callable on the blocking thread pool.
//! - [`shell`] holds [`ShellJob`], which runs an external command with
//!   `tokio::process::Command`.
//! - [`build_job`] turns a classified [`JobSpec`] into a runnable job.

pub mod action;
pub mod shell;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::build::Stage;
use crate::errors::Result;
use crate::spec::JobSpec;

pub use action::{action, Action, ActionJob, ActionRegistry};
pub use shell::ShellJob;

/// Boxed future returned by [`Runnable::run`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Minimal capability shared by jobs and stages.
pub trait Runnable: Send + Sync + Debug {
    /// Run to completion and report success.
    fn run(&self) -> BoxFuture<'_, bool>;

    /// Short description for logs and dry runs.
    fn describe(&self) -> String;
}

/// Build the runnable for a classified job.
///
/// Action names are resolved against `registry` here, so a missing action
/// fails at ingestion instead of at run time. Sequences become closed
/// sequential stages.
pub fn build_job(spec: &JobSpec, registry: &ActionRegistry) -> Result<Arc<dyn Runnable>> {
    match spec {
        JobSpec::Action { name, args } => {
            let action = registry.resolve(name)?;
            Ok(Arc::new(ActionJob::new(name.clone(), action, args.clone())))
        }
        JobSpec::Shell { argv, dir } => Ok(Arc::new(ShellJob::new(argv.clone(), dir.clone()))),
        JobSpec::Sequence(jobs) => {
            let mut sequence = Stage::sequential();
            for job in jobs {
                sequence.add(build_job(job, registry)?)?;
            }
            sequence.close()?;
            Ok(Arc::new(sequence))
        }
    }
}
