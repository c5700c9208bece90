//! Single-instance cycle lock.
//!
//! Overlapping poller invocations (a slow cycle plus an eager cron) would
//! race on the ledger and the artifact store. A lock file created with
//! `create_new` keeps a second instance out while a cycle runs; a lock left
//! behind by a killed process counts as stale once it is old enough and is
//! replaced.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

/// Age past which a leftover lock is assumed to belong to a dead process.
const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Held for the duration of one poll cycle; released on drop.
#[derive(Debug)]
pub struct CycleLock {
    path: PathBuf,
}

impl CycleLock {
    /// Try to take the lock. `None` means another instance holds a fresh
    /// lock and this cycle should be skipped.
    pub fn acquire(path: &Path) -> Option<Self> {
        Self::acquire_with(path, STALE_AFTER)
    }

    /// As [`acquire`](Self::acquire), with an explicit staleness horizon.
    pub fn acquire_with(path: &Path, stale_after: Duration) -> Option<Self> {
        match Self::try_create(path) {
            Ok(lock) => Some(lock),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if Self::is_stale(path, stale_after) {
                    warn!(path = %path.display(), "Replacing stale cycle lock");
                    let _ = std::fs::remove_file(path);
                    Self::try_create(path).ok()
                } else {
                    None
                }
            }
            Err(e) => {
                // An unwritable lock location must not stop paging
                warn!(path = %path.display(), error = %e, "Cannot create cycle lock, proceeding without");
                Some(Self {
                    path: PathBuf::new(),
                })
            }
        }
    }

    fn try_create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let _ = write!(file, "{}", std::process::id());
        debug!(path = %path.display(), "Acquired cycle lock");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn is_stale(path: &Path, stale_after: Duration) -> bool {
        match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified
                .elapsed()
                .map(|age| age >= stale_after)
                .unwrap_or(false),
            // Racing holder may have just released it; treat as stale and retry
            Err(_) => true,
        }
    }
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        if !self.path.as_os_str().is_empty() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
