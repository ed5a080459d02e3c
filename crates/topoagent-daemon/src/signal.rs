//! Signal plumbing shared by the lifecycle and supervisor: liveness
//! probing and SIGTERM delivery to a pid or its process group.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill, killpg};
use nix::unistd::{Pid, getpgid};
use tracing::debug;

/// Result of probing a pid with a zero signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// A process with that pid exists and is signalable.
    Alive,
    /// No such process.
    Dead,
    /// A process exists but this user may not signal it. Distinct from
    /// `Dead` because the remediation differs.
    PermissionDenied,
}

/// Probe whether a process with `pid` exists, without signalling it.
pub fn probe(pid: i32) -> Liveness {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => Liveness::Alive,
        Err(Errno::EPERM) => Liveness::PermissionDenied,
        Err(_) => Liveness::Dead,
    }
}

/// Send SIGTERM to `pid`. An already-gone process ("no such process") is
/// treated as success.
pub fn terminate(pid: i32) -> nix::Result<()> {
    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Err(Errno::ESRCH) => {
            debug!(pid, "process already gone");
            Ok(())
        }
        other => other,
    }
}

/// Send SIGTERM to the process group of `pid`, reaching a supervising
/// parent and its worker in one delivery.
pub fn terminate_group(pid: i32) -> nix::Result<()> {
    let pgid = getpgid(Some(Pid::from_raw(pid)))?;
    match killpg(pgid, Signal::SIGTERM) {
        Err(Errno::ESRCH) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
