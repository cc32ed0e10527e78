//! # Lock Files
//!
//! Advisory, file-based mutual exclusion over a [`Target`]. The lock is a
//! sibling file `<filename>.lock` holding the writer's process id; its mere
//! existence means "locked".
//!
//! Contention is a hard failure: [`acquire`] never waits or retries. Only
//! cooperating adapters that check the lock are kept apart; a process that
//! ignores the convention can still write the target.

use crate::error::{ProxyError, Result};
use crate::target::Target;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// A held lock. Call [`LockGuard::release`] to delete the lock file; if the
/// guard is dropped without being released (e.g. while unwinding) it removes
/// the file on a best-effort basis.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    owner: u32,
    released: bool,
}

impl LockGuard {
    pub fn owner(&self) -> u32 {
        self.owner
    }

    /// Delete the lock file. A lock file that is already gone means something
    /// outside this process interfered, which is reported as an error.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|e| ProxyError::fs(&self.path, e))?;
        debug!(path = %self.path.display(), "lock released");
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    file = %self.path.display(),
                    error = %error,
                    "failed to remove lock file"
                );
            }
            _ => {}
        }
    }
}

/// Take the lock for `target`, failing immediately if a lock file exists.
///
/// The lock file is created with `create_new`, so two cooperating writers
/// racing past an `is_locked` check still cannot both succeed.
pub fn acquire(target: &Target) -> Result<LockGuard> {
    let path = target.lock_path();
    let owner = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(lock_held(target));
        }
        Err(e) => return Err(ProxyError::fs(&path, e)),
    };

    // From here on the guard owns the file, so a failed pid write still cleans up.
    let guard = LockGuard {
        path,
        owner,
        released: false,
    };
    write!(file, "{owner}").map_err(|e| ProxyError::fs(&guard.path, e))?;

    debug!(path = %guard.path.display(), owner, "lock acquired");
    Ok(guard)
}

pub fn is_locked(target: &Target) -> bool {
    target.lock_path().exists()
}

/// Process id recorded in the lock file, or `None` when the target is unlocked.
pub fn lock_owner(target: &Target) -> Option<String> {
    fs::read_to_string(target.lock_path())
        .ok()
        .map(|raw| raw.trim().to_string())
}

/// Build the error reported when someone else holds the lock.
pub fn lock_held(target: &Target) -> ProxyError {
    ProxyError::LockHeld {
        owner: lock_owner(target).unwrap_or_else(|| "None".to_string()),
        path: target.full_path().to_path_buf(),
    }
}

/// Remove a lock file regardless of who wrote it. Returns the recorded owner,
/// or `None` if there was nothing to remove.
pub fn force_unlock(target: &Target) -> Result<Option<String>> {
    let owner = lock_owner(target);
    let path = target.lock_path();
    match fs::remove_file(&path) {
        Ok(()) => {
            warn!(path = %path.display(), owner = ?owner, "lock forcibly removed");
            Ok(owner)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProxyError::fs(&path, e)),
    }
}
