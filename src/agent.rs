//! The collector agent daemon: keeps a worker subprocess running under
//! the lifecycle and reports its identity.

use serde_json::json;
use tracing::{info, warn};

use topoagent_daemon::signal::{self, Liveness};
use topoagent_daemon::{
    Daemon, DaemonConfig, DaemonError, PidFile, ProcessExecutor, RESTART_EXIT_STATUS,
};

pub(crate) const AGENT_NAME: &str = "topoagent";

/// The agent daemon. With a worker command configured, `run()` executes
/// it to completion; under auto-restart the supervisor re-forks the
/// whole worker process when that execution ends.
pub(crate) struct CollectorAgent {
    config: DaemonConfig,
    worker: Vec<String>,
    executor: ProcessExecutor,
}

impl CollectorAgent {
    pub(crate) fn new(config: DaemonConfig, worker: Vec<String>) -> Self {
        Self {
            config,
            worker,
            executor: ProcessExecutor::new(),
        }
    }
}

impl Daemon for CollectorAgent {
    fn config(&self) -> &DaemonConfig {
        &self.config
    }

    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn run(&mut self) -> Result<(), DaemonError> {
        if self.worker.is_empty() {
            info!("no worker command configured, idling");
            loop {
                std::thread::sleep(std::time::Duration::from_secs(1));
            }
        }

        info!(command = %self.worker.join(" "), "launching worker");
        match self.executor.execute(&self.worker, false, None)? {
            0 => Ok(()),
            RESTART_EXIT_STATUS => {
                info!("worker asked to be restarted");
                Ok(())
            }
            code => {
                warn!(code, "worker exited abnormally");
                Err(DaemonError::WorkerFailed(code))
            }
        }
    }

    fn info(&self) -> Result<serde_json::Value, DaemonError> {
        Ok(json!({
            "name": self.name(),
            "version": env!("CARGO_PKG_VERSION"),
            "pid": PidFile::new(&self.config.pid_file).read(),
        }))
    }

    /// On Linux the recorded pid is checked against its command line, so
    /// a recycled pid belonging to an unrelated process does not block a
    /// start. Elsewhere a liveness probe is the best available answer.
    fn is_my_process(&self, pid: i32) -> bool {
        #[cfg(target_os = "linux")]
        if let Some(argv0) = proc_argv0(pid) {
            return argv0.contains(self.name());
        }
        matches!(
            signal::probe(pid),
            Liveness::Alive | Liveness::PermissionDenied
        )
    }
}

#[cfg(target_os = "linux")]
fn proc_argv0(pid: i32) -> Option<String> {
    let cmdline = std::fs::read_to_string(format!("/proc/{pid}/cmdline")).ok()?;
    cmdline
        .split('\0')
        .next()
        .filter(|argv0| !argv0.is_empty())
        .map(str::to_string)
}
