//! File primitives shared by the persisted state files.
//!
//! - [`write_json_atomic`] replaces a file through a temporary sibling and a
//!   rename, so readers see either the old or the new contents.
//! - [`read_json_or_default`] treats missing or corrupt files as empty.
//! - [`FileLock`] is a scoped exclusive advisory lock on a dedicated file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{CostlineError, Result};

/// Serialize `value` and atomically replace `path` with it.
///
/// The parent directory is created when missing.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    std::fs::create_dir_all(&parent).map_err(|e| CostlineError::DirectoryCreation {
        path: parent.clone(),
        source: e,
    })?;

    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| CostlineError::json_parse(path.display().to_string(), e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)
        .map_err(|e| CostlineError::io("creating temp file in", &parent, e))?;
    tmp.write_all(&json)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| CostlineError::io("writing", tmp.path().to_path_buf(), e))?;

    tmp.persist(path).map_err(|e| CostlineError::AtomicWrite {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

/// Read a JSON file, returning `T::default()` when it is missing or corrupt.
///
/// Corruption is logged and otherwise ignored; the next write repairs it.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable state file, starting empty");
            return T::default();
        }
    };

    if contents.trim().is_empty() {
        return T::default();
    }

    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt state file, reinitializing");
            T::default()
        }
    }
}

/// Exclusive advisory lock held until drop.
///
/// The lock lives on its own file so the locked data file can still be
/// replaced by rename while the lock is held.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until the exclusive lock on `path` is held.
    ///
    /// Returns `None` when locking is unavailable (unsupported platform, or the
    /// lock file cannot be opened); callers then proceed unlocked.
    pub fn acquire(path: &Path) -> Option<Self> {
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            debug!(path = %parent.display(), error = %e, "lock dir unavailable, running unlocked");
            return None;
        }

        let file = match OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
        {
            Ok(f) => f,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "lock file unavailable, running unlocked");
                return None;
            }
        };

        match lock_exclusive(&file) {
            Ok(()) => {
                debug!(path = %path.display(), "acquired exclusive lock");
                Some(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "flock failed, running unlocked");
                None
            }
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // closing the descriptor releases the lock as well
        let _ = unlock(&self.file);
    }
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    loop {
        // SAFETY: the descriptor is owned by `file` and stays open for the call
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(unix)]
fn unlock(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "advisory locks are not supported on this platform",
    ))
}

#[cfg(not(unix))]
fn unlock(_file: &File) -> std::io::Result<()> {
    Ok(())
}
