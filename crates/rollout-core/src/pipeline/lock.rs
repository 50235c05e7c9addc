//! Per-branch deploy lock.
//!
//! One lock file per branch under `<state_dir>/locks/`, named by the BLAKE3
//! hash of the normalized branch (`refs/heads/main` and `main` share a lock)
//! so any branch name maps to a safe file name. The file
//! is created with `create_new`, so only one holder can exist at a time
//! across threads and processes. Dropping the guard removes it.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::PipelineError;
use crate::environment::normalize_branch;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub branch: String,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

/// Held lock. Removes the lock file on drop.
#[derive(Debug)]
pub struct BranchLock {
    path: PathBuf,
    info: LockInfo,
}

pub fn lock_dir(state_dir: &Path) -> PathBuf {
    state_dir.join("locks")
}

pub fn lock_path(lock_dir: &Path, branch: &str) -> PathBuf {
    let branch = normalize_branch(branch);
    let hash = blake3::hash(branch.as_bytes()).to_hex();
    lock_dir.join(format!("{}.lock", &hash[..16]))
}

impl BranchLock {
    /// Acquire the lock for `branch`, queueing up to `wait` behind another
    /// holder. `Duration::ZERO` fails immediately when the lock is held.
    pub fn acquire(lock_dir: &Path, branch: &str, wait: Duration) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(lock_dir)
            .with_context(|| format!("Failed to create lock directory: {}", lock_dir.display()))
            .map_err(PipelineError::Internal)?;

        let branch = normalize_branch(branch);
        let path = lock_path(lock_dir, branch);
        let deadline = Instant::now() + wait;
        let mut announced = false;

        loop {
            match Self::try_create(&path, branch) {
                Ok(lock) => {
                    debug!(branch, path = %path.display(), "acquired branch lock");
                    return Ok(lock);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        let holder = read_lock(&path).ok().flatten();
                        return Err(PipelineError::LockBusy {
                            branch: branch.to_string(),
                            holder: holder.map(|h| format!("pid {} since {}", h.pid, h.acquired_at)),
                        });
                    }
                    if !announced {
                        info!(branch, "another deploy of this branch is in progress; waiting");
                        announced = true;
                    }
                    std::thread::sleep(
                        POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())),
                    );
                }
                Err(e) => {
                    return Err(PipelineError::Internal(
                        anyhow::Error::new(e)
                            .context(format!("Failed to create lock file: {}", path.display())),
                    ));
                }
            }
        }
    }

    fn try_create(path: &Path, branch: &str) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let info = LockInfo {
            branch: branch.to_string(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let body = serde_json::to_string(&info).map_err(std::io::Error::other)?;
        if let Err(e) = file.write_all(body.as_bytes()) {
            let _ = std::fs::remove_file(path);
            return Err(e);
        }
        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BranchLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "failed to remove branch lock");
        }
    }
}

/// Read a lock file; `None` when no lock exists.
pub fn read_lock(path: &Path) -> anyhow::Result<Option<LockInfo>> {
    match std::fs::read_to_string(path) {
        Ok(body) => {
            let info = serde_json::from_str(&body)
                .with_context(|| format!("Corrupt lock file: {}", path.display()))?;
            Ok(Some(info))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read lock file: {}", path.display())),
    }
}

/// Remove a stale lock. Returns whether a lock file existed.
pub fn force_unlock(lock_dir: &Path, branch: &str) -> anyhow::Result<bool> {
    let path = lock_path(lock_dir, branch);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove lock file: {}", path.display())),
    }
}
