// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::spec::RawJobSpec;
use crate::types::{CheckMode, Strictness};

/// A build file as read from disk.
///
/// ```toml
/// [config]
/// check = "mtime"
/// strict = true
///
/// [strings]
/// out = "build"
///
/// [[job]]
/// target = "{out}/a.txt"
/// dep = "a.src"
/// cmd = "cp a.src {out}/a.txt"
///
/// [[job]]
/// stage = "docs"
/// cmd = "echo done"
/// ```
///
/// All sections are optional. JSON files use the same shape, or a bare array
/// of job records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBuildFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Replacement values for `{name}` tokens in job fields.
    #[serde(default)]
    pub strings: BTreeMap<String, String>,

    /// Job records, in file order.
    #[serde(default)]
    pub job: Vec<RawJobSpec>,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// `"mtime"`, `"force"` or `"ignore"`; validated when the file is
    /// converted into a [`BuildFile`].
    #[serde(default)]
    pub check: Option<String>,

    /// Whether lifecycle violations raise (`true`, default) or only warn.
    #[serde(default)]
    pub strict: Option<bool>,
}

/// A validated build file: settings parsed, string tokens substituted.
#[derive(Debug, Clone, Default)]
pub struct BuildFile {
    pub check: Option<CheckMode>,
    pub strict: Option<bool>,
    pub jobs: Vec<RawJobSpec>,
}

impl BuildFile {
    pub(crate) fn new_unchecked(
        check: Option<CheckMode>,
        strict: Option<bool>,
        jobs: Vec<RawJobSpec>,
    ) -> Self {
        Self { check, strict, jobs }
    }

    /// Append `other`'s jobs; settings it defines override ours.
    pub fn merge(&mut self, other: BuildFile) {
        if other.check.is_some() {
            self.check = other.check;
        }
        if other.strict.is_some() {
            self.strict = other.strict;
        }
        self.jobs.extend(other.jobs);
    }

    pub fn check_mode(&self) -> CheckMode {
        self.check.unwrap_or_default()
    }

    pub fn strictness(&self) -> Strictness {
        Strictness::from_flag(self.strict.unwrap_or(true))
    }
}
