// src/spec/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// A field that accepts either a single string or a list of strings.
///
/// Used for `cmd`, `dir` and the dependency fields:
///
/// ```toml
/// cmd = "cp in out"
/// cmd = ["cp", "in", "out"]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Split into tokens: a single string is split on whitespace, a list is
    /// taken as-is.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            StringOrList::One(s) => s.split_whitespace().map(str::to_string).collect(),
            StringOrList::Many(items) => items.clone(),
        }
    }
}

impl From<&str> for StringOrList {
    fn from(s: &str) -> Self {
        StringOrList::One(s.to_string())
    }
}

impl From<Vec<String>> for StringOrList {
    fn from(items: Vec<String>) -> Self {
        StringOrList::Many(items)
    }
}

/// One job record as handed over by a document parser.
///
/// This is a direct mapping of the build file fields:
///
/// ```toml
/// [[job]]
/// target = "out"
/// dep = ["in"]
/// cmd = "cp in out"
/// ```
///
/// No semantic checks happen here; see [`RawJobSpec::classify`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawJobSpec {
    /// Identifier of a registered action.
    #[serde(default)]
    pub job: Option<String>,

    /// Action arguments (list or mapping) or extra shell arguments
    /// (string or list).
    #[serde(default)]
    pub args: Option<Value>,

    /// Shell command: a string split on whitespace, or a token list.
    #[serde(default)]
    pub cmd: Option<StringOrList>,

    /// Working directory for a shell command; a list is joined as path
    /// segments.
    #[serde(default)]
    pub dir: Option<StringOrList>,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub dependency: Option<StringOrList>,

    #[serde(default)]
    pub dep: Option<StringOrList>,

    #[serde(default)]
    pub deps: Option<StringOrList>,

    #[serde(default)]
    pub stage: Option<String>,

    /// Nested jobs forming a sequence.
    #[serde(default)]
    pub tasks: Option<Vec<RawJobSpec>>,
}

impl RawJobSpec {
    /// Whether any of `dependency`, `dep` or `deps` is present.
    pub fn has_dependency_field(&self) -> bool {
        self.dependency.is_some() || self.dep.is_some() || self.deps.is_some()
    }

    /// Normalized dependency list. The first present field wins, in the order
    /// `dependency`, `dep`, `deps`.
    pub fn dependencies(&self) -> Vec<String> {
        self.dependency
            .as_ref()
            .or(self.dep.as_ref())
            .or(self.deps.as_ref())
            .map(StringOrList::tokens)
            .unwrap_or_default()
    }
}

/// Arguments passed to an action.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JobArgs {
    #[default]
    None,
    Positional(Vec<Value>),
    Keyword(BTreeMap<String, Value>),
}

impl JobArgs {
    /// Positional argument at `idx`, if the arguments are positional.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        match self {
            JobArgs::Positional(values) => values.get(idx),
            _ => None,
        }
    }

    /// Keyword argument `key`, if the arguments are keyword arguments.
    pub fn get_named(&self, key: &str) -> Option<&Value> {
        match self {
            JobArgs::Keyword(map) => map.get(key),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            JobArgs::None => 0,
            JobArgs::Positional(values) => values.len(),
            JobArgs::Keyword(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
