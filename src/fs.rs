//! File-system queries and temporary-directory lifecycle.

use std::env;
use std::fs;
use std::io::{Error, ErrorKind};
use std::mem;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

/// Returns the time at which `path` was last modified, or `None` if it does
/// not exist (or cannot be inspected).
pub fn modification_time<P: AsRef<Path>>(path: P) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Recursively deletes `path` and everything below it.
pub fn remove_tree<P: AsRef<Path>>(path: P) -> Result<(), Error> {
    fs::remove_dir_all(path.as_ref()).map_err(|err| {
        log::error!(
            "failed to remove directory tree {}: {}",
            path.as_ref().display(),
            err
        );
        err
    })
}

static NEXT_TEMP_DIR_ID: AtomicUsize = AtomicUsize::new(0);

/// A uniquely named directory under the system temporary directory, removed
/// with everything in it when dropped.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new() -> Result<TempDir, Error> {
        // A process id plus a process-local counter is unique enough for a
        // directory we fully control; no need to pull in the tempfile crate.
        // A stale leftover from a recycled pid just advances the counter.
        let base = env::temp_dir();
        loop {
            let id = NEXT_TEMP_DIR_ID.fetch_add(1, Ordering::Relaxed);
            let path = base.join(format!("groundwork-{}-{}", process::id(), id));
            match fs::create_dir(&path) {
                Ok(()) => return Ok(TempDir { path }),
                Err(ref err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases ownership: the directory is no longer removed on drop.
    pub fn into_path(mut self) -> PathBuf {
        let path = mem::replace(&mut self.path, PathBuf::new());
        mem::forget(self);
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _cleanup_is_best_effort = remove_tree(&self.path);
    }
}
