//! Daemon subcommand handlers. Each returns the process exit code so
//! `main` stays the single place that terminates.

use tracing::error;

use topoagent_daemon::{Daemon, DaemonError};

use crate::agent::CollectorAgent;

pub(crate) fn daemon_start(agent: &mut CollectorAgent, foreground: bool) -> i32 {
    report(agent.start(foreground))
}

pub(crate) fn daemon_stop(agent: &CollectorAgent) -> i32 {
    report(agent.stop())
}

pub(crate) fn daemon_restart(agent: &mut CollectorAgent) -> i32 {
    report(agent.restart())
}

pub(crate) fn daemon_status(agent: &CollectorAgent) -> i32 {
    let status = agent.status();
    println!("{status}");
    status.exit_code()
}

pub(crate) fn daemon_info(agent: &CollectorAgent) -> i32 {
    match agent.info() {
        Ok(info) => match serde_json::to_string_pretty(&info) {
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

fn report(result: Result<(), DaemonError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            1
        }
    }
}
