//! Single-writer run lock.
//!
//! The ledger and the periodic-task table are both load-modify-store
//! resources. A run holds [`RunLock`] for its whole duration so two
//! overlapping invocations cannot interleave their writes.

use crate::error::{Result, StreakError};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Locks older than this belong to a crashed run and are evicted.
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(10 * 60);

/// Guard over an exclusively created lock file. Removes the file on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Lock path used for a given ledger file (`<ledger>.lock`).
    #[must_use]
    pub fn path_for(ledger_path: &Path) -> PathBuf {
        let mut name = ledger_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        ledger_path.with_file_name(name)
    }

    /// Take the lock without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`StreakError::Lock`] when a fresh lock is held by another run.
    pub fn acquire(lock_path: &Path) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StreakError::Lock(format!("failed to create lock directory: {e}"))
            })?;
        }

        for attempt in 0..2 {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(lock_path)
            {
                Ok(mut file) => {
                    if let Err(e) = write!(file, "{}", std::process::id()) {
                        tracing::warn!("cannot record pid in {}: {e}", lock_path.display());
                    }
                    return Ok(Self {
                        path: lock_path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt == 0 => {
                    if !evict_stale_lock(lock_path) {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => break,
                Err(e) => {
                    return Err(StreakError::Lock(format!(
                        "failed to create run lock {}: {e}",
                        lock_path.display()
                    )));
                }
            }
        }

        Err(StreakError::Lock(format!(
            "another run holds {}",
            lock_path.display()
        )))
    }

    /// Path of the held lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Remove the lock file if it is older than [`STALE_LOCK_AGE`]. Returns `true`
/// when it was removed.
fn evict_stale_lock(lock_path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(lock_path) else {
        // Vanished between the create and the stat; let the caller retry.
        return true;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    let Ok(age) = SystemTime::now().duration_since(modified) else {
        return false;
    };

    if age > STALE_LOCK_AGE {
        tracing::warn!("evicting stale run lock {}", lock_path.display());
        return std::fs::remove_file(lock_path).is_ok();
    }
    false
}
