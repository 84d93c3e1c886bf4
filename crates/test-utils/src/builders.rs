#![allow(dead_code)]

use buildc::spec::{RawJobSpec, StringOrList};
use serde_json::Value;

/// Builder for `RawJobSpec` to simplify test setup.
#[derive(Debug, Clone, Default)]
pub struct SpecBuilder {
    spec: RawJobSpec,
}

impl SpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spec tracked in the dependency graph.
    pub fn target(name: &str) -> Self {
        let mut b = Self::new();
        b.spec.target = Some(name.to_string());
        b
    }

    /// A free spec attached to a stage.
    pub fn stage(name: &str) -> Self {
        let mut b = Self::new();
        b.spec.stage = Some(name.to_string());
        b
    }

    /// Append a prerequisite (stored under `dep`).
    pub fn dep(mut self, dep: &str) -> Self {
        match self.spec.dep.get_or_insert_with(|| StringOrList::Many(Vec::new())) {
            StringOrList::Many(items) => items.push(dep.to_string()),
            StringOrList::One(s) => {
                s.push(' ');
                s.push_str(dep);
            }
        }
        self
    }

    /// Set `deps` as a whitespace-delimited string.
    pub fn deps_str(mut self, deps: &str) -> Self {
        self.spec.deps = Some(StringOrList::One(deps.to_string()));
        self
    }

    /// Set `dependency` as a list.
    pub fn dependency(mut self, deps: &[&str]) -> Self {
        self.spec.dependency = Some(StringOrList::Many(
            deps.iter().map(|d| d.to_string()).collect(),
        ));
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.spec.cmd = Some(StringOrList::One(cmd.to_string()));
        self
    }

    pub fn cmd_tokens(mut self, tokens: &[&str]) -> Self {
        self.spec.cmd = Some(StringOrList::Many(
            tokens.iter().map(|t| t.to_string()).collect(),
        ));
        self
    }

    pub fn dir(mut self, dir: &str) -> Self {
        self.spec.dir = Some(StringOrList::One(dir.to_string()));
        self
    }

    pub fn job(mut self, name: &str) -> Self {
        self.spec.job = Some(name.to_string());
        self
    }

    pub fn args(mut self, args: Value) -> Self {
        self.spec.args = Some(args);
        self
    }

    pub fn tasks(mut self, tasks: Vec<RawJobSpec>) -> Self {
        self.spec.tasks = Some(tasks);
        self
    }

    pub fn build(self) -> RawJobSpec {
        self.spec
    }
}

/// Graph task running the `record` action with its own name as argument.
pub fn recorded_target(name: &str, deps: &[&str]) -> RawJobSpec {
    let mut b = SpecBuilder::target(name)
        .job("record")
        .args(Value::Array(vec![Value::String(name.to_string())]));
    for dep in deps {
        b = b.dep(dep);
    }
    b.build()
}

/// Free task in `stage` running the `record` action with `label`.
pub fn recorded_stage_job(stage: &str, label: &str) -> RawJobSpec {
    SpecBuilder::stage(stage)
        .job("record")
        .args(Value::Array(vec![Value::String(label.to_string())]))
        .build()
}
