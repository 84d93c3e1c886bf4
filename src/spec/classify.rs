// src/spec/classify.rs

//! Turns a [`RawJobSpec`] into a typed [`ClassifiedSpec`].
//!
//! Shape is decided once here by which of `job` / `cmd` / `tasks` is present;
//! nothing downstream looks at raw fields again.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{BuildError, Result};
use crate::spec::model::{JobArgs, RawJobSpec};

/// Stage name used for free jobs that name neither a target nor a stage.
pub const UNSPECIFIED_STAGE: &str = "__unspecified";

/// The three job shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum JobSpec {
    /// A registered action called with arguments.
    Action { name: String, args: JobArgs },
    /// An external command.
    Shell {
        argv: Vec<String>,
        dir: Option<PathBuf>,
    },
    /// Nested jobs run in order as a sequential unit.
    Sequence(Vec<JobSpec>),
}

impl JobSpec {
    /// Classify the shape of `raw`, ignoring its scheduling fields.
    pub fn from_raw(raw: &RawJobSpec) -> Result<Self> {
        let shapes = [raw.job.is_some(), raw.cmd.is_some(), raw.tasks.is_some()]
            .iter()
            .filter(|present| **present)
            .count();

        if shapes > 1 {
            return Err(BuildError::InvalidJob(format!(
                "spec mixes `job`, `cmd` and `tasks`; exactly one is allowed: {raw:?}"
            )));
        }

        if raw.dir.is_some() && raw.cmd.is_none() {
            return Err(BuildError::InvalidJob(format!(
                "`dir` only applies to shell jobs with `cmd`: {raw:?}"
            )));
        }

        if let Some(name) = &raw.job {
            let args = action_args(raw.args.as_ref())?;
            return Ok(JobSpec::Action {
                name: name.clone(),
                args,
            });
        }

        if let Some(cmd) = &raw.cmd {
            let mut argv = cmd.tokens();
            argv.extend(shell_args(raw.args.as_ref())?);
            if argv.is_empty() {
                return Err(BuildError::InvalidJob(format!(
                    "shell job has an empty command: {raw:?}"
                )));
            }
            let dir = raw
                .dir
                .as_ref()
                .map(|d| d.tokens().iter().collect::<PathBuf>());
            return Ok(JobSpec::Shell { argv, dir });
        }

        if let Some(tasks) = &raw.tasks {
            let mut jobs = Vec::with_capacity(tasks.len());
            for task in tasks {
                if task.target.is_some() || task.stage.is_some() || task.has_dependency_field() {
                    return Err(BuildError::InvalidJob(format!(
                        "nested task cannot declare `target`, `stage` or dependencies: {task:?}"
                    )));
                }
                jobs.push(JobSpec::from_raw(task)?);
            }
            return Ok(JobSpec::Sequence(jobs));
        }

        Err(BuildError::InvalidJob(format!(
            "spec does not match a known job type (needs `job`, `cmd` or `tasks`): {raw:?}"
        )))
    }

    /// Short human-readable description, used in logs and dry runs.
    pub fn describe(&self) -> String {
        match self {
            JobSpec::Action { name, args } => format!("{name}({} args)", args.len()),
            JobSpec::Shell { argv, dir: None } => argv.join(" "),
            JobSpec::Shell {
                argv,
                dir: Some(dir),
            } => format!("(cd {} && {})", dir.display(), argv.join(" ")),
            JobSpec::Sequence(jobs) => {
                let inner: Vec<String> = jobs.iter().map(JobSpec::describe).collect();
                format!("[{}]", inner.join("; "))
            }
        }
    }
}

/// Where a classified job gets scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheduling {
    /// Tracked in the dependency graph.
    Target { name: String, deps: Vec<String> },
    /// Free task, always run with its stage.
    Stage(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSpec {
    pub scheduling: Scheduling,
    pub job: JobSpec,
}

impl RawJobSpec {
    /// Classify both the scheduling intent and the job shape.
    ///
    /// - `target` and `stage` together are ambiguous and rejected.
    /// - A spec with dependencies and only a `stage` becomes a target of that
    ///   name.
    /// - A spec with neither lands in [`UNSPECIFIED_STAGE`].
    pub fn classify(&self) -> Result<ClassifiedSpec> {
        let job = JobSpec::from_raw(self)?;

        let scheduling = match (&self.target, &self.stage) {
            (Some(_), Some(_)) => {
                return Err(BuildError::InvalidJob(format!(
                    "spec cannot have both a `stage` and a `target`: {self:?}"
                )));
            }
            (Some(target), None) => Scheduling::Target {
                name: target.clone(),
                deps: self.dependencies(),
            },
            (None, Some(stage)) if self.has_dependency_field() => {
                debug!(stage = %stage, "stage with dependencies; tracking it as a target");
                Scheduling::Target {
                    name: stage.clone(),
                    deps: self.dependencies(),
                }
            }
            (None, Some(stage)) => Scheduling::Stage(stage.clone()),
            (None, None) if self.has_dependency_field() => {
                return Err(BuildError::InvalidJob(format!(
                    "spec declares dependencies without a `target`: {self:?}"
                )));
            }
            (None, None) => {
                warn!(
                    job = %job.describe(),
                    "job lacks a stage name; adding it to \"{UNSPECIFIED_STAGE}\""
                );
                Scheduling::Stage(UNSPECIFIED_STAGE.to_string())
            }
        };

        Ok(ClassifiedSpec { scheduling, job })
    }
}

fn action_args(args: Option<&Value>) -> Result<JobArgs> {
    match args {
        None | Some(Value::Null) => Ok(JobArgs::None),
        Some(Value::Array(values)) => Ok(JobArgs::Positional(values.clone())),
        Some(Value::Object(map)) => Ok(JobArgs::Keyword(
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        )),
        Some(other) => Err(BuildError::InvalidJob(format!(
            "action args must be a list or a mapping, got: {other}"
        ))),
    }
}

fn shell_args(args: Option<&Value>) -> Result<Vec<String>> {
    match args {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Some(Value::Array(values)) => Ok(values.iter().map(value_to_arg).collect()),
        Some(other) => Err(BuildError::InvalidJob(format!(
            "shell args must be a string or a list, got: {other}"
        ))),
    }
}

fn value_to_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
