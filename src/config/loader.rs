// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::config::model::{BuildFile, RawBuildFile};
use crate::errors::{BuildError, Result};

/// File names probed, in order, when no build file is given.
pub const DEFAULT_BUILD_FILES: &[&str] = &["buildc.toml", "buildc.json"];

/// Load a build file and return the raw `RawBuildFile`.
///
/// The format follows the extension: `.toml` or `.json` / `.jsn`. This only
/// deserializes; use [`load_and_validate`] for settings validation and
/// string substitution.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBuildFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let raw = match ext.as_deref() {
        Some("toml") => toml::from_str(&contents)?,
        Some("json") | Some("jsn") => parse_json(&contents)?,
        _ => {
            return Err(BuildError::InvalidConfiguration(format!(
                "format of {} is unclear (expected .toml or .json)",
                path.display()
            )));
        }
    };

    debug!(path = %path.display(), "loaded build file");
    Ok(raw)
}

/// JSON accepts either the full object shape or a bare array of jobs.
fn parse_json(contents: &str) -> Result<RawBuildFile> {
    let value: Value = serde_json::from_str(contents)?;
    let raw = match value {
        Value::Array(_) => RawBuildFile {
            job: serde_json::from_value(value)?,
            ..RawBuildFile::default()
        },
        other => serde_json::from_value(other)?,
    };
    Ok(raw)
}

/// Load a build file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BuildFile> {
    let raw = load_from_path(&path)?;
    BuildFile::try_from(raw)
}

/// Load and merge several build files, in order.
pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<BuildFile> {
    if paths.is_empty() {
        return Err(BuildError::InvalidConfiguration(format!(
            "no build files given and none of {DEFAULT_BUILD_FILES:?} found"
        )));
    }

    let mut merged = BuildFile::default();
    for path in paths {
        let file = load_and_validate(path)?;
        info!(path = %path.as_ref().display(), jobs = file.jobs.len(), "loaded jobs");
        merged.merge(file);
    }
    Ok(merged)
}

/// Default build files that exist in `dir`.
pub fn default_build_files(dir: &Path) -> Vec<PathBuf> {
    DEFAULT_BUILD_FILES
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| path.exists())
        .collect()
}
