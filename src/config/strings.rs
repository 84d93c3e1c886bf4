// src/config/strings.rs

//! `{name}` token substitution in job specs.

use std::collections::BTreeMap;

use anyhow::Context;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::errors::{BuildError, Result};
use crate::spec::{RawJobSpec, StringOrList};

const TOKEN_PATTERN: &str = r"\{([A-Za-z_][A-Za-z0-9_.-]*)\}";

/// Replaces `{name}` tokens with values from a `[strings]` table.
///
/// An empty table disables substitution entirely, so literal braces in
/// commands survive untouched. With a non-empty table, a token naming an
/// unknown key fails with `InvalidJob`.
#[derive(Debug, Clone)]
pub struct Substituter {
    pattern: Regex,
    strings: BTreeMap<String, String>,
}

impl Substituter {
    pub fn new(strings: BTreeMap<String, String>) -> Result<Self> {
        let pattern = Regex::new(TOKEN_PATTERN).context("compiling substitution pattern")?;
        Ok(Self { pattern, strings })
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn substitute_str(&self, input: &str) -> Result<String> {
        if self.is_empty() {
            return Ok(input.to_string());
        }

        let mut missing: Option<String> = None;
        let out = self.pattern.replace_all(input, |caps: &Captures<'_>| {
            let key = &caps[1];
            match self.strings.get(key) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| key.to_string());
                    caps[0].to_string()
                }
            }
        });

        match missing {
            Some(key) => Err(BuildError::InvalidJob(format!(
                "'{input}' uses unknown replacement key '{key}'"
            ))),
            None => Ok(out.into_owned()),
        }
    }

    /// Substitute every string field of `spec`, nested tasks included.
    pub fn substitute_spec(&self, spec: &RawJobSpec) -> Result<RawJobSpec> {
        if self.is_empty() {
            return Ok(spec.clone());
        }

        let tasks = match &spec.tasks {
            Some(tasks) => Some(
                tasks
                    .iter()
                    .map(|task| self.substitute_spec(task))
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        Ok(RawJobSpec {
            job: self.opt_str(spec.job.as_deref())?,
            args: spec.args.as_ref().map(|v| self.value(v)).transpose()?,
            cmd: self.opt_list(spec.cmd.as_ref())?,
            dir: self.opt_list(spec.dir.as_ref())?,
            target: self.opt_str(spec.target.as_deref())?,
            dependency: self.opt_list(spec.dependency.as_ref())?,
            dep: self.opt_list(spec.dep.as_ref())?,
            deps: self.opt_list(spec.deps.as_ref())?,
            stage: self.opt_str(spec.stage.as_deref())?,
            tasks,
        })
    }

    fn opt_str(&self, value: Option<&str>) -> Result<Option<String>> {
        value.map(|s| self.substitute_str(s)).transpose()
    }

    fn opt_list(&self, value: Option<&StringOrList>) -> Result<Option<StringOrList>> {
        value
            .map(|v| match v {
                StringOrList::One(s) => self.substitute_str(s).map(StringOrList::One),
                StringOrList::Many(items) => items
                    .iter()
                    .map(|s| self.substitute_str(s))
                    .collect::<Result<Vec<_>>>()
                    .map(StringOrList::Many),
            })
            .transpose()
    }

    fn value(&self, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.substitute_str(s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.value(v))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.value(v)?);
                }
                Value::Object(out)
            }
            other => other.clone(),
        })
    }
}
