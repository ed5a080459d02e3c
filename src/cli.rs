//! CLI definitions for the topology agent.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Topology agent CLI.
#[derive(Parser)]
#[command(name = "topoagent")]
#[command(about = "Topology collector agent daemon")]
#[command(version)]
pub(crate) struct Cli {
    /// PID file path
    #[arg(long, global = true)]
    pub pid_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start the agent daemon
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(long)]
        foreground: bool,

        /// Re-fork the worker whenever it dies
        #[arg(long)]
        auto_restart: bool,

        /// Worker command the agent keeps running, after `--`
        #[arg(last = true)]
        worker: Vec<String>,
    },

    /// Stop the agent daemon
    Stop {
        /// The daemon was started with auto-restart; signal its whole
        /// process group so the supervising parent stops too
        #[arg(long)]
        auto_restart: bool,
    },

    /// Restart the agent daemon
    Restart {
        /// Re-fork the worker whenever it dies
        #[arg(long)]
        auto_restart: bool,

        /// Worker command the agent keeps running, after `--`
        #[arg(last = true)]
        worker: Vec<String>,
    },

    /// Get daemon status
    Status,

    /// Print agent info as JSON
    Info,

    /// Run the built-in process-inventory check once and print the snapshot
    Check {
        /// Worker command to include in the inventory, after `--`
        #[arg(last = true)]
        worker: Vec<String>,
    },
}
