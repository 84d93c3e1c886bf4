// src/fs/mock.rs

use super::FileSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// In-memory filesystem holding one modification time per path.
///
/// Clones share the same table, so a test can keep a handle and touch files
/// after handing the mock to a compiler.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, SystemTime>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` as modified at `secs` seconds after the Unix epoch.
    pub fn touch(&self, path: impl AsRef<Path>, secs: u64) {
        self.set_modified(path, UNIX_EPOCH + Duration::from_secs(secs));
    }

    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), time);
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        files.remove(path.as_ref());
    }
}

impl FileSystem for MockFileSystem {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        let files = self.files.lock().unwrap();
        files.get(path).copied()
    }
}
