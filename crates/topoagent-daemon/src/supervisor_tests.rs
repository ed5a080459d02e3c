use std::cell::Cell;
use std::process::Command;
use std::time::Duration;

use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, fork};
use serial_test::serial;

use super::*;

/// Run `scenario` in a forked scratch process and assert it exits 0.
/// Supervision loops fork and exit on their own, so the assertions travel
/// back as the scratch process's exit code.
fn run_in_scratch_process(scenario: impl FnOnce() -> i32) {
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => assert_eq!(code, 0, "scenario failed, see code"),
            other => panic!("unexpected wait result: {other:?}"),
        },
        Ok(ForkResult::Child) => {
            let code = scenario();
            // skip the test harness's own exit machinery in the scratch copy
            unsafe { libc::_exit(code) };
        }
        Err(e) => panic!("fork failed: {e}"),
    }
}

#[test]
#[serial]
fn test_crashing_worker_is_reforked_until_stop() {
    run_in_scratch_process(|| {
        let supervisor = AgentSupervisor::new().with_poll_interval(Duration::from_millis(10));
        let state = supervisor.state();

        let deaths = Cell::new(0u32);
        let mut on_worker_death = || {
            deaths.set(deaths.get() + 1);
            if deaths.get() >= 3 {
                state.request_stop();
            }
        };
        // simulated crash: every worker dies immediately with status 1
        let worker = || {
            std::process::exit(1);
        };

        match supervisor.supervise(Some(&mut on_worker_death), Some(&worker)) {
            Ok(SupervisorRole::Parent) if deaths.get() > 1 => 0,
            Ok(SupervisorRole::Parent) => 10, // stopped without reforking
            Ok(SupervisorRole::Worker) => 11, // worker must never get here
            Err(_) => 12,
        }
    });
}

#[test]
#[serial]
fn test_worker_role_returns_control_to_caller() {
    run_in_scratch_process(|| {
        let supervisor = AgentSupervisor::new().with_poll_interval(Duration::from_millis(10));
        let state = supervisor.state();

        let deaths = Cell::new(0u32);
        let mut on_worker_death = || {
            deaths.set(deaths.get() + 1);
            if deaths.get() >= 2 {
                state.request_stop();
            }
        };

        match supervisor.supervise(Some(&mut on_worker_death), None) {
            // each forked worker lands here and continues past the loop
            Ok(SupervisorRole::Worker) => unsafe { libc::_exit(7) },
            Ok(SupervisorRole::Parent) if deaths.get() >= 2 => 0,
            Ok(SupervisorRole::Parent) => 10,
            Err(_) => 12,
        }
    });
}

#[test]
#[serial]
fn test_sigterm_to_parent_forwards_and_stops() {
    run_in_scratch_process(|| {
        let supervisor = AgentSupervisor::new().with_poll_interval(Duration::from_millis(10));
        let state = supervisor.state();

        // deliver SIGTERM to ourselves once the first worker is tracked
        std::thread::spawn({
            let state = supervisor.state();
            move || {
                for _ in 0..200 {
                    if state.child_pid.load(std::sync::atomic::Ordering::SeqCst) > 0 {
                        low_level::raise(SIGTERM).unwrap();
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
        });

        // long-lived worker that only dies when signalled
        let worker = || {
            std::thread::sleep(Duration::from_secs(30));
            std::process::exit(0);
        };

        match supervisor.supervise(None, Some(&worker)) {
            Ok(SupervisorRole::Parent) if state.stop_requested() => 0,
            Ok(SupervisorRole::Parent) => 10,
            Ok(SupervisorRole::Worker) => 11,
            Err(_) => 12,
        }
    });
}

#[test]
#[serial]
fn test_sigterm_to_worker_alone_is_reforked() {
    run_in_scratch_process(|| {
        let supervisor = AgentSupervisor::new().with_poll_interval(Duration::from_millis(10));
        let state = supervisor.state();

        // keep terminating whichever worker is tracked; the parent must
        // treat each death as a crash and fork again, never stop
        std::thread::spawn({
            let state = supervisor.state();
            move || {
                let mut last = 0;
                for _ in 0..400 {
                    let pid = state.child_pid.load(std::sync::atomic::Ordering::SeqCst);
                    if pid > 0 && pid != last {
                        unsafe { libc::kill(pid, libc::SIGTERM) };
                        last = pid;
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
        });

        let deaths = Cell::new(0u32);
        let mut on_worker_death = || {
            deaths.set(deaths.get() + 1);
            if deaths.get() >= 2 {
                state.request_stop();
            }
        };
        let worker = || {
            std::thread::sleep(Duration::from_secs(30));
            std::process::exit(0);
        };

        match supervisor.supervise(Some(&mut on_worker_death), Some(&worker)) {
            Ok(SupervisorRole::Parent) if deaths.get() >= 2 => 0,
            Ok(SupervisorRole::Parent) => 10, // stopped on a worker-only signal
            Ok(SupervisorRole::Worker) => 11,
            Err(_) => 12,
        }
    });
}

#[test]
fn test_handler_forwards_to_tracked_child() {
    let state = SupervisorState::new();
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    state.track(child.id() as i32);

    // the parent path: forward and flag
    assert!(state.forward_term());
    assert!(state.stop_requested());

    for _ in 0..50 {
        if child.try_wait().unwrap().is_some() {
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child.kill().ok();
    panic!("tracked child did not receive the forwarded SIGTERM");
}

#[test]
fn test_handler_treats_untracked_as_worker() {
    let state = SupervisorState::new();
    // no child tracked: the handler must not flag a stop; the real
    // handler exits the process on this path instead
    assert!(!state.forward_term());
    assert!(!state.stop_requested());
}

#[test]
fn test_restart_sentinel_value() {
    assert_eq!(RESTART_EXIT_STATUS, 5);
}
