// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::BuildError;

/// How the rebuild oracle decides whether a target is stale.
///
/// - `Mtime`: compare modification times of the target and its dependencies
///   (default).
/// - `Force`: every target is stale.
/// - `Ignore`: no target is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    #[default]
    Mtime,
    Force,
    Ignore,
}

impl FromStr for CheckMode {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mtime" => Ok(CheckMode::Mtime),
            "force" => Ok(CheckMode::Force),
            "ignore" => Ok(CheckMode::Ignore),
            other => Err(BuildError::InvalidConfiguration(format!(
                "invalid check mode: {other} (expected \"mtime\", \"force\" or \"ignore\")"
            ))),
        }
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckMode::Mtime => "mtime",
            CheckMode::Force => "force",
            CheckMode::Ignore => "ignore",
        };
        f.write_str(s)
    }
}

/// Policy for lifecycle and validation violations.
///
/// Under `Strict` they raise a [`BuildError`]; under `Permissive` they are
/// logged as warnings and the operation reports `false` instead.
///
/// Structural errors in the input graph (invalid jobs, cycles, unknown
/// targets) always raise, whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    #[default]
    Strict,
    Permissive,
}

impl Strictness {
    pub fn from_flag(strict: bool) -> Self {
        if strict {
            Strictness::Strict
        } else {
            Strictness::Permissive
        }
    }

    pub fn is_strict(self) -> bool {
        self == Strictness::Strict
    }
}

/// The two stage variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Order-independent jobs, run concurrently; fail-together.
    #[default]
    Parallel,
    /// Ordered jobs, run one at a time; fail-fast.
    Sequential,
}

impl FromStr for StageKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stage" | "parallel" => Ok(StageKind::Parallel),
            "seq" | "sequence" | "sequential" => Ok(StageKind::Sequential),
            other => Err(BuildError::InvalidStage(format!(
                "unknown stage kind: {other} (expected \"parallel\" or \"sequential\")"
            ))),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Parallel => f.write_str("parallel"),
            StageKind::Sequential => f.write_str("sequential"),
        }
    }
}
