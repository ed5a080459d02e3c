//! Daemon configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the PID file.
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,

    /// File the daemon's stdin is redirected from. `None` uses the
    /// platform discard device.
    #[serde(default)]
    pub stdin: Option<PathBuf>,

    /// File the daemon's stdout is appended to. `None` uses the platform
    /// discard device.
    #[serde(default)]
    pub stdout: Option<PathBuf>,

    /// File the daemon's stderr is appended to. `None` uses the platform
    /// discard device.
    #[serde(default)]
    pub stderr: Option<PathBuf>,

    /// Whether a supervising parent re-forks the worker whenever it exits.
    #[serde(default)]
    pub auto_restart: bool,

    /// Whether daemonization redirects the standard streams onto the
    /// configured files. Resolved once at construction: stream redirection
    /// is known to break on macOS, so it is excluded there outright rather
    /// than probed at runtime.
    #[serde(default = "default_redirect_std_streams")]
    pub redirect_std_streams: bool,
}

const DEV_NULL: &str = "/dev/null";

fn default_pid_file() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".topoagent").join("topoagent.pid"))
        .unwrap_or_else(|| PathBuf::from("/tmp/topoagent.pid"))
}

fn default_redirect_std_streams() -> bool {
    cfg!(not(target_os = "macos"))
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: default_pid_file(),
            stdin: None,
            stdout: None,
            stderr: None,
            auto_restart: false,
            redirect_std_streams: default_redirect_std_streams(),
        }
    }
}

impl DaemonConfig {
    /// Create a config with the given PID file path.
    pub fn with_pid_file(pid_file: PathBuf) -> Self {
        Self {
            pid_file,
            ..Default::default()
        }
    }

    /// Path stdin is redirected from during daemonization.
    pub fn stdin_path(&self) -> PathBuf {
        self.stdin.clone().unwrap_or_else(|| PathBuf::from(DEV_NULL))
    }

    /// Path stdout is appended to during daemonization.
    pub fn stdout_path(&self) -> PathBuf {
        self.stdout
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEV_NULL))
    }

    /// Path stderr is appended to during daemonization.
    pub fn stderr_path(&self) -> PathBuf {
        self.stderr
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEV_NULL))
    }
}
