//! Synchronous wrapper around a worker subprocess.
//!
//! Runs an external command to completion, optionally captures its output
//! through temporary files, and forwards SIGTERM/SIGINT to it while it
//! runs. The original use is keeping a JVM-based sub-check runner under
//! the agent's control.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use signal_hook::SigId;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::low_level;
use tracing::{debug, error, warn};

use crate::error::DaemonError;

/// Executes one subprocess at a time and tracks its liveness.
///
/// Clones share the tracked-child state, so a clone can `terminate()` or
/// inspect `status()` while another thread blocks in `execute()`.
#[derive(Clone)]
pub struct ProcessExecutor {
    child_pid: Arc<AtomicI32>,
    running: Arc<AtomicBool>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self {
            child_pid: Arc::new(AtomicI32::new(0)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Exit-code view of the runner: 0 while a subprocess is tracked and
    /// running, 1 otherwise. A convention for callers, not an error check.
    pub fn status(&self) -> i32 {
        if self.child_pid.load(Ordering::SeqCst) > 0 && self.running.load(Ordering::SeqCst) {
            0
        } else {
            1
        }
    }

    /// Send SIGTERM to the tracked subprocess. No-op when none is tracked.
    pub fn terminate(&self) {
        let pid = self.child_pid.load(Ordering::SeqCst);
        if pid > 0 {
            debug!("caught termination request, stopping subprocess");
            // SAFETY: kill(2) is async-signal-safe; ESRCH from a child
            // that just exited is the expected race and ignored.
            unsafe { libc::kill(pid, libc::SIGTERM) };
        }
    }

    /// Run `args` to completion and return its exit code.
    ///
    /// With `redirect_output` the child's stdout and stderr are captured
    /// into temporary buffers and replayed to this process's own streams
    /// (stdout first, then stderr) once the child exits; otherwise the
    /// child inherits them directly. `env`, when given, replaces the
    /// child's entire environment. Blocks until the child terminates.
    pub fn execute(
        &self,
        args: &[String],
        redirect_output: bool,
        env: Option<&HashMap<String, String>>,
    ) -> Result<i32, DaemonError> {
        self.execute_with_sinks(
            args,
            redirect_output,
            env,
            &mut io::stdout(),
            &mut io::stderr(),
        )
    }

    /// `execute()` with explicit replay sinks; the seam tests use to
    /// observe the captured streams.
    pub fn execute_with_sinks(
        &self,
        args: &[String],
        redirect_output: bool,
        env: Option<&HashMap<String, String>>,
        out_sink: &mut dyn Write,
        err_sink: &mut dyn Write,
    ) -> Result<i32, DaemonError> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| DaemonError::Spawn("empty command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(rest);
        if let Some(env) = env {
            cmd.env_clear();
            cmd.envs(env);
        }

        let mut capture = None;
        if redirect_output {
            let out_file = tempfile::tempfile()?;
            let err_file = tempfile::tempfile()?;
            cmd.stdout(Stdio::from(out_file.try_clone()?));
            cmd.stderr(Stdio::from(err_file.try_clone()?));
            capture = Some((out_file, err_file));
        }

        let mut child = cmd.spawn().map_err(|e| {
            error!("could not launch process {program}: {e}");
            DaemonError::Spawn(e.to_string())
        })?;
        self.child_pid.store(child.id() as i32, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let handler_ids = self.register_signal_handlers();

        // synchronous wait: blocks this process until the child exits
        let wait_result = child.wait();
        self.running.store(false, Ordering::SeqCst);
        self.child_pid.store(0, Ordering::SeqCst);
        for id in handler_ids {
            low_level::unregister(id);
        }
        let status = wait_result?;

        if let Some((mut out_file, mut err_file)) = capture {
            // replay order is fixed: captured stdout, then captured stderr
            replay(&mut out_file, out_sink)?;
            replay(&mut err_file, err_sink)?;
        }

        Ok(exit_code(&status))
    }

    /// Route SIGTERM and SIGINT into `terminate()` while a child runs.
    /// Registration failure is logged, not fatal.
    fn register_signal_handlers(&self) -> Vec<SigId> {
        let mut ids = Vec::new();
        for sig in [SIGTERM, SIGINT] {
            let pid = self.child_pid.clone();
            // SAFETY: the handler only reads an atomic and calls kill(2).
            let registered = unsafe {
                low_level::register(sig, move || {
                    let p = pid.load(Ordering::SeqCst);
                    if p > 0 {
                        unsafe { libc::kill(p, libc::SIGTERM) };
                    }
                })
            };
            match registered {
                Ok(id) => ids.push(id),
                Err(e) => warn!("unable to register signal handler: {e}"),
            }
        }
        ids
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn replay(file: &mut std::fs::File, sink: &mut dyn Write) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    sink.write_all(&buf)?;
    sink.flush()
}

/// The child's real exit code; a signal death `n` is reported as `-n`.
fn exit_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .unwrap_or_else(|| -status.signal().unwrap_or(0))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
