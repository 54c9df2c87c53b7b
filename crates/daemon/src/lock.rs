// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance PID lock.
//!
//! One daemon per user account. The lock is a file holding the owner's
//! PID, guarded by an exclusive advisory lock while the daemon runs. A
//! leftover file whose recorded PID is no longer alive is stale and is
//! taken over silently.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use fs2::FileExt;
use thiserror::Error;

/// Lock errors
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Daemon already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("Lock file is held by another process")]
    Held,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An acquired PID lock. Dropping it releases the advisory lock; call
/// [`PidLock::release`] to also remove the file.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
    pid: u32,
    // NOTE(lifetime): held to maintain the exclusive advisory lock
    #[allow(dead_code)]
    file: File,
}

impl PidLock {
    /// Acquire the lock for `pid`, failing when another live daemon holds it.
    pub fn acquire(path: &Path, pid: u32) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Open without truncating so a running daemon's PID is never wiped
        // before we actually hold the lock.
        let mut options = std::fs::OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path)?;

        if file.try_lock_exclusive().is_err() {
            // Somebody holds the flock. Report their PID when readable.
            return match read_pid_file(path) {
                Some(pid) if process_alive(pid) => Err(LockError::AlreadyRunning { pid }),
                _ => Err(LockError::Held),
            };
        }

        // We hold the flock. A recorded PID belonging to a different live
        // process means the lock file outlived its advisory lock (e.g. a
        // filesystem that dropped it); treat that process as the owner.
        if let Some(recorded) = read_pid_file(path) {
            if recorded != pid && process_alive(recorded) {
                fs2::FileExt::unlock(&file)?;
                return Err(LockError::AlreadyRunning { pid: recorded });
            }
        }

        // Stale or fresh: record ourselves.
        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{pid}")?;
        file.flush()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            pid,
            file,
        })
    }

    /// Remove the lock file, but only while it still records our PID.
    pub fn release(self) -> Result<(), LockError> {
        if read_pid_file(&self.path) == Some(self.pid) {
            std::fs::remove_file(&self.path)?;
        }
        // flock released when self.file drops
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse the first line of a PID file.
pub fn read_pid_file(path: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().next()?.trim().parse().ok()
}

/// Check if a process with the given PID is alive via a zero signal.
pub fn process_alive(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
