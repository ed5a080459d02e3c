//! Daemon-related errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during daemon operations.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// PID file points at a live instance of this agent.
    #[error("another instance is already running (pidfile: {path}, pid: {pid})")]
    AlreadyRunning { path: PathBuf, pid: i32 },

    /// Failed to write the PID file. Fatal: a daemon that cannot be found
    /// by `status`/`stop` must not keep running.
    #[error("unable to write pidfile {path}: {reason}")]
    PidFileWrite { path: PathBuf, reason: String },

    /// Failed to detach from the invoking session/terminal.
    #[error("failed to detach from the controlling terminal: {0}")]
    DetachFailed(String),

    /// Failed to redirect the standard streams to the configured files.
    #[error("failed to redirect standard streams: {0}")]
    StreamRedirect(String),

    /// Failed to register a signal handler.
    #[error("failed to set up signal handlers: {0}")]
    SignalSetup(String),

    /// Subprocess could not be launched.
    #[error("could not launch process: {0}")]
    Spawn(String),

    /// A hook the concrete daemon was supposed to supply was invoked on
    /// the base implementation.
    #[error("{operation}() must be implemented by the concrete daemon")]
    NotImplemented { operation: &'static str },

    /// The supervised worker exited with a non-zero status.
    #[error("worker exited with status {0}")]
    WorkerFailed(i32),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
