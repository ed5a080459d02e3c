//! Fork-based supervisor that keeps a worker process alive.
//!
//! The supervising parent forks a worker, polls it with a non-blocking
//! wait, and forks again whenever it dies. A SIGTERM to the parent is
//! forwarded to the tracked worker and stops the loop; a SIGTERM before
//! any fork (or in the worker itself) exits immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;

use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, fork};
use signal_hook::consts::SIGTERM;
use signal_hook::low_level;
use tracing::{debug, error, info};

use crate::error::DaemonError;

/// Reserved exit status a worker may use to request a deliberate restart.
///
/// The loop currently re-forks on any worker exit, deliberate or crash,
/// so this sentinel receives no distinct handling; it is published so
/// workers and supervisors agree on the value.
pub const RESTART_EXIT_STATUS: i32 = 5;

/// Default interval between non-blocking wait polls. Bounds both
/// restart-detection and stop-request latency.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Which side of the fork the caller ended up on once the loop is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorRole {
    /// The supervising parent; it has no further work of its own.
    Parent,
    /// The worker: control returns to the caller, which continues as the
    /// real daemon process.
    Worker,
}

/// State shared between the supervision loop and the SIGTERM handler.
///
/// `child_pid == 0` means "no worker tracked": the handler then treats
/// the process as the worker (or not yet forked) and exits instead of
/// forwarding. The handler may interrupt the loop at any point, so every
/// transition here is a single atomic store.
#[derive(Debug)]
pub struct SupervisorState {
    child_pid: AtomicI32,
    need_stop: AtomicBool,
}

impl SupervisorState {
    fn new() -> Self {
        Self {
            child_pid: AtomicI32::new(0),
            need_stop: AtomicBool::new(false),
        }
    }

    fn track(&self, pid: i32) {
        self.child_pid.store(pid, Ordering::SeqCst);
    }

    /// Whether a stop was requested by the SIGTERM handler or a caller.
    pub fn stop_requested(&self) -> bool {
        self.need_stop.load(Ordering::SeqCst)
    }

    /// Ask the loop to stop: flag it and pass SIGTERM on to the tracked
    /// worker, if any.
    pub fn request_stop(&self) {
        self.need_stop.store(true, Ordering::SeqCst);
        let pid = self.child_pid.load(Ordering::SeqCst);
        if pid > 0 {
            // SAFETY: kill(2) is async-signal-safe; an ESRCH for an
            // already-reaped worker is harmless and ignored.
            unsafe { libc::kill(pid, libc::SIGTERM) };
        }
    }

    /// Handler body for SIGTERM. Returns `false` when no worker is
    /// tracked, in which case this process is the worker (or pre-fork)
    /// and should exit instead.
    fn forward_term(&self) -> bool {
        if self.child_pid.load(Ordering::SeqCst) > 0 {
            self.request_stop();
            true
        } else {
            false
        }
    }
}

/// A simple supervisor that restarts a worker on expected auto-restarts.
pub struct AgentSupervisor {
    state: Arc<SupervisorState>,
    poll_interval: Duration,
}

impl AgentSupervisor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SupervisorState::new()),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Shorten the wait-poll interval. Tests use this; production keeps
    /// the 1-second default.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Handle on the shared loop/handler state.
    pub fn state(&self) -> Arc<SupervisorState> {
        self.state.clone()
    }

    /// Run the supervision loop. `parent_hook` is invoked in the parent
    /// every time the worker dies; `child_fn` runs in each forked worker.
    ///
    /// Exits the process with status 0 once the parent role is told to
    /// stop; returns only in the worker role, handing control back to the
    /// caller (which continues as the real daemon process when `child_fn`
    /// is `None`).
    pub fn start(
        &self,
        parent_hook: Option<&mut dyn FnMut()>,
        child_fn: Option<&dyn Fn()>,
    ) -> Result<(), DaemonError> {
        match self.supervise(parent_hook, child_fn)? {
            SupervisorRole::Parent => std::process::exit(0),
            SupervisorRole::Worker => Ok(()),
        }
    }

    /// The loop itself, free of process exits so the parent path can run
    /// under test. `start()` is the production entry point.
    pub fn supervise(
        &self,
        mut parent_hook: Option<&mut dyn FnMut()>,
        child_fn: Option<&dyn Fn()>,
    ) -> Result<SupervisorRole, DaemonError> {
        self.install_sigterm_handler()?;
        self.state.need_stop.store(false, Ordering::SeqCst);

        loop {
            self.state.track(0);
            // SAFETY: single supervision thread; the worker branch only
            // runs the caller's function or returns to it.
            match unsafe { fork() } {
                Ok(ForkResult::Parent { child }) => {
                    self.state.track(child.as_raw());
                    debug!(pid = child.as_raw(), "forked worker");

                    while !self.state.stop_requested() {
                        match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
                            Ok(WaitStatus::StillAlive) => {
                                std::thread::sleep(self.poll_interval);
                            }
                            // exited, signalled, or reaped out from under us
                            _ => break,
                        }
                    }

                    if let Some(hook) = parent_hook.as_mut() {
                        hook();
                    }

                    if self.state.stop_requested() {
                        info!("supervisor stopping");
                        return Ok(SupervisorRole::Parent);
                    }
                    // every worker death re-forks, whatever the exit code
                }
                Ok(ForkResult::Child) => match child_fn {
                    // if the worker function returns, the worker becomes a
                    // supervisor of its own and the loop forks again
                    Some(f) => f(),
                    None => return Ok(SupervisorRole::Worker),
                },
                Err(e) => {
                    let msg = format!("agent fork failed: {} ({})", e as i32, e.desc());
                    error!("{msg}");
                    eprintln!("{msg}");
                    std::process::exit(1);
                }
            }
        }
    }

    fn install_sigterm_handler(&self) -> Result<(), DaemonError> {
        let state = self.state.clone();
        // SAFETY: the handler only touches atomics, kill(2) and _exit(2),
        // all async-signal-safe.
        unsafe {
            low_level::register(SIGTERM, move || {
                if !state.forward_term() {
                    low_level::exit(0);
                }
            })
        }
        .map(|_| ())
        .map_err(|e| DaemonError::SignalSetup(e.to_string()))
    }
}

impl Default for AgentSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
