// src/dag/oracle.rs

//! Staleness decisions for targets.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::CheckMode;

/// Decides whether a target needs rebuilding.
///
/// In [`CheckMode::Mtime`] a target is stale when:
/// - it does not exist, or
/// - any dependency does not exist, or
/// - any dependency was modified after the target.
///
/// A target with no dependencies that exists is up to date.
#[derive(Debug, Clone)]
pub struct RebuildOracle {
    mode: CheckMode,
    fs: Arc<dyn FileSystem>,
}

impl Default for RebuildOracle {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl RebuildOracle {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            mode: CheckMode::default(),
            fs,
        }
    }

    pub fn with_mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> CheckMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CheckMode) {
        debug!(%mode, "setting rebuild check mode");
        self.mode = mode;
    }

    /// Parse and set the mode; an unknown value fails with
    /// `InvalidConfiguration` and leaves the current mode in place.
    pub fn set_mode_str(&mut self, mode: &str) -> Result<()> {
        let mode: CheckMode = mode.parse()?;
        self.set_mode(mode);
        Ok(())
    }

    pub fn filesystem(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    /// Whether `target` is stale relative to `dependencies`.
    pub fn decide(&self, target: &str, dependencies: &[String]) -> bool {
        match self.mode {
            CheckMode::Force => true,
            CheckMode::Ignore => false,
            CheckMode::Mtime => self.check_mtime(target, dependencies),
        }
    }

    fn check_mtime(&self, target: &str, dependencies: &[String]) -> bool {
        let Some(target_mtime) = self.fs.modified(Path::new(target)) else {
            debug!(target = %target, "target does not exist; needs rebuild");
            return true;
        };

        for dep in dependencies {
            match self.fs.modified(Path::new(dep)) {
                None => {
                    debug!(target = %target, dep = %dep, "dependency missing; needs rebuild");
                    return true;
                }
                Some(dep_mtime) if dep_mtime > target_mtime => {
                    debug!(target = %target, dep = %dep, "dependency is newer; needs rebuild");
                    return true;
                }
                Some(_) => {}
            }
        }

        trace!(target = %target, "target up to date");
        false
    }
}
