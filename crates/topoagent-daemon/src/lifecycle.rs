//! Daemon lifecycle: double-fork detachment and PID-file-based
//! start/stop/restart/status, in the classic Stevens shape.
//!
//! Concrete daemons implement [`Daemon`] and override `run()` (and
//! usually `info()`); the lifecycle operations are provided.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;

use nix::unistd::{ForkResult, chdir, dup2, fork, setsid};
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::pid::PidFile;
use crate::signal::{self, Liveness};
use crate::supervisor::AgentSupervisor;

/// What a `status()` probe found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// No usable PID file.
    NotRunning,
    /// A live process holds the recorded pid.
    Running { pid: i32 },
    /// The PID file names a pid with no process behind it.
    NoSuchProcess { pid: i32 },
    /// A process exists but probing it was denied.
    PermissionDenied,
}

/// Status report for a daemon, printable as the user-facing status line.
#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub name: String,
    pub kind: StatusKind,
}

impl DaemonStatus {
    /// Process exit code convention: 0 running, 1 anything else.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            StatusKind::Running { .. } => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StatusKind::NotRunning => write!(f, "{} is not running", self.name),
            StatusKind::Running { pid } => {
                write!(f, "{} is running with pid {}", self.name, pid)
            }
            StatusKind::NoSuchProcess { pid } => write!(
                f,
                "{} pidfile contains pid {}, but no running process could be found",
                self.name, pid
            ),
            StatusKind::PermissionDenied => {
                write!(f, "you do not have sufficient permissions")
            }
        }
    }
}

/// A generic daemon.
///
/// Implement `config()`/`name()` and override `run()`; the lifecycle
/// operations (`start`, `stop`, `restart`, `status`, `daemonize`) come
/// with the trait. Invoking the base `run()` or `info()` is a programming
/// error and fails with [`DaemonError::NotImplemented`].
pub trait Daemon {
    fn config(&self) -> &DaemonConfig;

    /// Short name used in user-facing status lines.
    fn name(&self) -> &str;

    /// Daemon entry point, called once the process is detached and the
    /// PID file written. Runs until the process should exit.
    fn run(&mut self) -> Result<(), DaemonError> {
        Err(DaemonError::NotImplemented { operation: "run" })
    }

    /// Status-describing structure for the host.
    fn info(&self) -> Result<serde_json::Value, DaemonError> {
        Err(DaemonError::NotImplemented { operation: "info" })
    }

    /// Whether the pid recorded in the PID file belongs to one of this
    /// agent's processes. The default is a bare liveness probe; concrete
    /// daemons narrow it to their own process identity.
    fn is_my_process(&self, pid: i32) -> bool {
        matches!(
            signal::probe(pid),
            Liveness::Alive | Liveness::PermissionDenied
        )
    }

    /// Start the daemon: refuse if an instance already runs, detach
    /// unless `foreground`, record the pid, then hand off to `run()`.
    fn start(&mut self, foreground: bool) -> Result<(), DaemonError> {
        info!("starting");

        let mut pid_file = PidFile::new(&self.config().pid_file);
        if let Some(pid) = pid_file.read() {
            if self.is_my_process(pid) {
                let err = DaemonError::AlreadyRunning {
                    path: self.config().pid_file.clone(),
                    pid,
                };
                error!("not starting, {err}");
                return Err(err);
            }
            warn!(
                pid,
                "pidfile does not contain the pid of an agent process, starting normally"
            );
        }

        if !foreground {
            self.daemonize()?;
        }

        pid_file.write_current()?;
        // the handle owns the file now and removes it when run() is done
        let _pid_guard = pid_file;
        self.run()
    }

    /// The UNIX double-fork dance: detach from the invoking shell,
    /// session and terminal. With auto-restart configured, the second
    /// fork is replaced by the supervisor's own fork and only the worker
    /// returns from here.
    fn daemonize(&self) -> Result<(), DaemonError> {
        // SAFETY: the lifecycle runs on the main thread before any worker
        // threads are spawned.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { .. }) => {
                // first parent exits, detaching from the foreground shell
                std::process::exit(0);
            }
            Ok(ForkResult::Child) => {}
            Err(e) => {
                let msg = format!("fork #1 failed: {} ({})", e as i32, e.desc());
                error!("{msg}");
                eprintln!("{msg}");
                std::process::exit(1);
            }
        }
        debug!("fork 1 ok");

        // decouple from the parent environment
        chdir("/").map_err(|e| DaemonError::DetachFailed(format!("chdir failed: {e}")))?;
        setsid().map_err(|e| DaemonError::DetachFailed(format!("setsid failed: {e}")))?;

        if self.config().auto_restart {
            info!("running with auto-restart on");
            // the supervisor's fork stands in for fork #2; only the
            // worker comes back from this call
            AgentSupervisor::new().start(None, None)?;
        } else {
            // second fork so the session leader exits and the daemon can
            // never reacquire a controlling terminal
            match unsafe { fork() } {
                Ok(ForkResult::Parent { .. }) => std::process::exit(0),
                Ok(ForkResult::Child) => {}
                Err(e) => {
                    let msg = format!("fork #2 failed: {} ({})", e as i32, e.desc());
                    error!("{msg}");
                    eprintln!("{msg}");
                    std::process::exit(1);
                }
            }
        }

        if self.config().redirect_std_streams {
            redirect_standard_streams(self.config())?;
        }

        info!("daemon started");
        Ok(())
    }

    /// Stop the running instance. The PID file is removed up front,
    /// whatever happens afterwards; a missing or unusable PID file means
    /// "not running" and succeeds (restarts stay idempotent).
    fn stop(&self) -> Result<(), DaemonError> {
        info!("stopping daemon");

        let mut pid_file = PidFile::new(&self.config().pid_file);
        let pid = pid_file.read();
        pid_file.remove();

        let Some(pid) = pid else {
            let message = format!(
                "pidfile {} does not exist, not running?",
                self.config().pid_file.display()
            );
            info!("{message}");
            eprintln!("{message}");
            // not an error in a restart
            return Ok(());
        };

        let result = if self.config().auto_restart {
            // reach the supervising parent and its worker in one go
            signal::terminate_group(pid).or_else(|e| {
                warn!(pid, "could not signal the process group ({e}), signalling the pid");
                signal::terminate(pid)
            })
        } else {
            signal::terminate(pid)
        };

        match result {
            Ok(()) => info!("daemon is stopped"),
            Err(e) => {
                // cleanup already happened; report but do not fail
                error!(pid, "cannot stop agent daemon: {e}");
                eprintln!("{e}");
            }
        }
        Ok(())
    }

    /// `stop()` then `start()`. No barrier in between: if the old process
    /// lingers past the signal, the fresh start can still find it alive.
    fn restart(&mut self) -> Result<(), DaemonError> {
        self.stop()?;
        self.start(false)
    }

    /// Probe the recorded pid and report the tri-state status.
    fn status(&self) -> DaemonStatus {
        let kind = match PidFile::new(&self.config().pid_file).read() {
            None => StatusKind::NotRunning,
            Some(pid) => match signal::probe(pid) {
                Liveness::Alive => StatusKind::Running { pid },
                Liveness::PermissionDenied => StatusKind::PermissionDenied,
                Liveness::Dead => StatusKind::NoSuchProcess { pid },
            },
        };

        let status = DaemonStatus {
            name: self.name().to_string(),
            kind,
        };
        info!("{status}");
        status
    }
}

/// Point the standard streams at the configured files: stdin read-only,
/// stdout/stderr append-create.
fn redirect_standard_streams(config: &DaemonConfig) -> Result<(), DaemonError> {
    io::stdout().flush().ok();
    io::stderr().flush().ok();

    let map_err = |what: &str, e: io::Error| {
        DaemonError::StreamRedirect(format!("cannot open {what}: {e}"))
    };
    let stdin = OpenOptions::new()
        .read(true)
        .open(config.stdin_path())
        .map_err(|e| map_err("stdin", e))?;
    let stdout = OpenOptions::new()
        .append(true)
        .create(true)
        .open(config.stdout_path())
        .map_err(|e| map_err("stdout", e))?;
    let stderr = OpenOptions::new()
        .append(true)
        .create(true)
        .open(config.stderr_path())
        .map_err(|e| map_err("stderr", e))?;

    for (fd, target) in [(stdin.as_raw_fd(), 0), (stdout.as_raw_fd(), 1), (stderr.as_raw_fd(), 2)] {
        dup2(fd, target).map_err(|e| DaemonError::StreamRedirect(format!("dup2 failed: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
