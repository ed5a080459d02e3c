//! PID file management for daemon processes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::DaemonError;

/// A file holding the running daemon's process identifier.
///
/// An absent, empty or non-numeric file reads as `None` ("not running"),
/// never as an error. Writing is fatal on failure: a daemon whose PID
/// cannot be recorded would be invisible to `status` and `stop`.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    owned: bool,
}

impl PidFile {
    /// Create a PID file handle. Nothing is touched on disk yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            owned: false,
        }
    }

    /// Get the PID file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the PID file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the recorded PID. `None` when the file is missing or does not
    /// hold a usable pid; callers treat that as "not running".
    pub fn read(&self) -> Option<i32> {
        let contents = fs::read_to_string(&self.path).ok()?;
        contents
            .trim()
            .parse::<i32>()
            .ok()
            // never hand out a pid that would signal init or a whole group
            .filter(|pid| *pid > 1)
    }

    /// Record the current process in the file.
    pub fn write_current(&mut self) -> Result<(), DaemonError> {
        self.write(std::process::id() as i32)
    }

    /// Write `pid` as decimal text with mode 0644. The handle owns the
    /// file afterwards and removes it when dropped.
    pub fn write(&mut self, pid: i32) -> Result<(), DaemonError> {
        self.try_write(pid).map_err(|e| {
            let err = DaemonError::PidFileWrite {
                path: self.path.clone(),
                reason: e.to_string(),
            };
            error!("{err}");
            err
        })
    }

    fn try_write(&mut self, pid: i32) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        write!(file, "{pid}")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o644))?;
        }

        self.owned = true;
        info!("pidfile created: {} (pid: {})", self.path.display(), pid);
        Ok(())
    }

    /// Remove the PID file. Best-effort: an already-missing file is not an
    /// error and nothing is reported beyond a debug line.
    pub fn remove(&mut self) {
        if fs::remove_file(&self.path).is_ok() {
            debug!("pidfile removed: {}", self.path.display());
        }
        self.owned = false;
    }
}

impl Drop for PidFile {
    // Counterpart of an at-exit cleanup hook: whoever wrote the pid
    // removes the file when it goes away.
    fn drop(&mut self) {
        if self.owned {
            self.remove();
        }
    }
}

#[cfg(test)]
#[path = "pid_tests.rs"]
mod tests;
