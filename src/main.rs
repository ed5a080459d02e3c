//! Topoagent - topology collector agent
//!
//! Main entry point for the topoagent CLI and daemon.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use topoagent_daemon::DaemonConfig;
use topoagent_topology::{InstanceConfig, TopologyCheck};

mod agent;
mod checks;
mod cli;
mod cmd_daemon;

use crate::agent::CollectorAgent;
use crate::checks::ProcessInventoryCheck;
use crate::cli::{Cli, Commands};

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match cli.pid_file {
        Some(path) => DaemonConfig::with_pid_file(path),
        None => DaemonConfig::default(),
    };

    let code = match cli.command {
        Commands::Start {
            foreground,
            auto_restart,
            worker,
        } => {
            config.auto_restart = auto_restart;
            let mut agent = CollectorAgent::new(config, worker);
            cmd_daemon::daemon_start(&mut agent, foreground)
        }
        Commands::Stop { auto_restart } => {
            config.auto_restart = auto_restart;
            cmd_daemon::daemon_stop(&CollectorAgent::new(config, Vec::new()))
        }
        Commands::Restart {
            auto_restart,
            worker,
        } => {
            config.auto_restart = auto_restart;
            let mut agent = CollectorAgent::new(config, worker);
            cmd_daemon::daemon_restart(&mut agent)
        }
        Commands::Status => cmd_daemon::daemon_status(&CollectorAgent::new(config, Vec::new())),
        Commands::Info => cmd_daemon::daemon_info(&CollectorAgent::new(config, Vec::new())),
        Commands::Check { worker } => run_check(worker),
    };
    std::process::exit(code);
}

/// Run the built-in inventory check once and print its snapshot.
fn run_check(worker: Vec<String>) -> i32 {
    let mut check = ProcessInventoryCheck::new(worker);
    match check.check(&InstanceConfig::default()) {
        Ok(snapshot) => match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => {
                println!("{text}");
                0
            }
            Err(e) => {
                eprintln!("{e}");
                1
            }
        },
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}
