//! # Topoagent Daemon
//!
//! Unix daemon lifecycle and process supervision for the topoagent
//! monitoring agent.
//!
//! ## Features
//!
//! - PID file management (prevents duplicate instances)
//! - Double-fork daemonization with standard-stream redirection
//! - Fork-based supervisor that re-forks a worker whenever it exits
//! - SIGTERM/SIGINT forwarding to supervised subprocesses
//! - Synchronous subprocess execution with output capture
//!
//! ## Usage
//!
//! ```rust,ignore
//! use topoagent_daemon::{Daemon, DaemonConfig};
//!
//! struct MyAgent { config: DaemonConfig }
//!
//! impl Daemon for MyAgent {
//!     fn config(&self) -> &DaemonConfig { &self.config }
//!     fn name(&self) -> &str { "my-agent" }
//!     fn run(&mut self) -> Result<(), topoagent_daemon::DaemonError> {
//!         // runs until the process should exit
//!         Ok(())
//!     }
//! }
//!
//! MyAgent { config: DaemonConfig::default() }.start(false)?;
//! ```

pub mod config;
pub mod error;
pub mod pid;

// Fork/signal based supervision only exists on POSIX platforms.
#[cfg(unix)]
pub mod executor;
#[cfg(unix)]
pub mod lifecycle;
#[cfg(unix)]
pub mod signal;
#[cfg(unix)]
pub mod supervisor;

// Re-exports
pub use config::DaemonConfig;
pub use error::DaemonError;
pub use pid::PidFile;

#[cfg(unix)]
pub use executor::ProcessExecutor;
#[cfg(unix)]
pub use lifecycle::{Daemon, DaemonStatus, StatusKind};
#[cfg(unix)]
pub use signal::Liveness;
#[cfg(unix)]
pub use supervisor::{AgentSupervisor, SupervisorRole, RESTART_EXIT_STATUS};
