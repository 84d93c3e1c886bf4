// src/fs/mod.rs

//! Filesystem probing used by the rebuild oracle.
//!
//! The core only needs to know whether a path exists and when it was last
//! modified. [`RealFileSystem`] asks `std::fs`; [`mock::MockFileSystem`]
//! serves explicit timestamps to tests.

use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::trace;

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Last modification time of `path`, or `None` if it does not exist
    /// (or its metadata cannot be read).
    fn modified(&self, path: &Path) -> Option<SystemTime>;

    fn exists(&self, path: &Path) -> bool {
        self.modified(path).is_some()
    }
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        match fs::metadata(path).and_then(|meta| meta.modified()) {
            Ok(time) => Some(time),
            Err(err) => {
                trace!(path = %path.display(), error = %err, "no modification time");
                None
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
