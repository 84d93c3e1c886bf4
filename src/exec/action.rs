// src/exec/action.rs

//! Registered actions: named Rust callables that jobs refer to by `job = "<name>"`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::errors::{BuildError, Result};
use crate::exec::{BoxFuture, Runnable};
use crate::spec::JobArgs;

/// A callable that can be referenced from a job spec.
///
/// Any `Fn(&JobArgs) -> anyhow::Result<()>` closure is an action. Returning
/// an error marks the job as failed.
pub trait Action: Send + Sync {
    fn call(&self, args: &JobArgs) -> anyhow::Result<()>;
}

impl<F> Action for F
where
    F: Fn(&JobArgs) -> anyhow::Result<()> + Send + Sync,
{
    fn call(&self, args: &JobArgs) -> anyhow::Result<()> {
        self(args)
    }
}

/// Pin a closure to the [`Action`] signature so its argument and error
/// types are inferred:
///
/// ```
/// use buildc::exec::action;
///
/// let touch = action(|_args| Ok(()));
/// ```
pub fn action<F>(f: F) -> F
where
    F: Fn(&JobArgs) -> anyhow::Result<()> + Send + Sync + 'static,
{
    f
}

/// Read-only mapping from identifier to action.
///
/// Built once by the host process and handed to the compiler; cloning is
/// cheap and shares the same actions.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, action: impl Action + 'static) {
        let name = name.into();
        if self.actions.insert(name.clone(), Arc::new(action)).is_some() {
            warn!(action = %name, "replacing previously registered action");
        } else {
            debug!(action = %name, "registered action");
        }
    }

    /// Builder-style variant of [`ActionRegistry::register`].
    pub fn with(mut self, name: impl Into<String>, action: impl Action + 'static) -> Self {
        self.register(name, action);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Look up `name`, failing with `InvalidJob` that lists what is available.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Action>> {
        self.actions.get(name).cloned().ok_or_else(|| {
            let available: Vec<&str> = self.names().collect();
            BuildError::InvalidJob(format!(
                "action '{name}' is not registered (available: {available:?})"
            ))
        })
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A job that calls a registered action.
///
/// The action runs on Tokio's blocking pool so that a slow action blocks
/// only its own job.
#[derive(Clone)]
pub struct ActionJob {
    name: String,
    action: Arc<dyn Action>,
    args: Arc<JobArgs>,
}

impl ActionJob {
    pub fn new(name: String, action: Arc<dyn Action>, args: JobArgs) -> Self {
        Self {
            name,
            action,
            args: Arc::new(args),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ActionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionJob")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

impl Runnable for ActionJob {
    fn run(&self) -> BoxFuture<'_, bool> {
        let action = Arc::clone(&self.action);
        let args = Arc::clone(&self.args);

        Box::pin(async move {
            info!(action = %self.name, "starting action");

            let outcome = tokio::task::spawn_blocking(move || action.call(&args)).await;

            match outcome {
                Ok(Ok(())) => {
                    debug!(action = %self.name, "action finished");
                    true
                }
                Ok(Err(err)) => {
                    warn!(action = %self.name, error = %err, "action failed");
                    false
                }
                Err(join_err) => {
                    error!(action = %self.name, error = %join_err, "action panicked or was cancelled");
                    false
                }
            }
        })
    }

    fn describe(&self) -> String {
        format!("{}({} args)", self.name, self.args.len())
    }
}
