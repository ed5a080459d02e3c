use std::process::Command;
use std::time::Duration;

use super::*;

// Beyond the default pid_max on every mainstream Linux/macOS setup.
const UNUSED_PID: i32 = 0x7ff0_0000;

#[test]
fn test_probe_current_process_is_alive() {
    assert_eq!(probe(std::process::id() as i32), Liveness::Alive);
}

#[test]
fn test_probe_unused_pid_is_dead() {
    assert_eq!(probe(UNUSED_PID), Liveness::Dead);
}

#[test]
fn test_terminate_swallows_no_such_process() {
    assert!(terminate(UNUSED_PID).is_ok());
}

#[test]
fn test_terminate_stops_a_spawned_child() {
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    let pid = child.id() as i32;

    terminate(pid).unwrap();

    for _ in 0..50 {
        if child.try_wait().unwrap().is_some() {
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child.kill().ok();
    panic!("child survived SIGTERM");
}

#[test]
fn test_terminate_group_fails_on_dead_pid() {
    // getpgid on a dead pid fails with ESRCH; callers fall back to
    // terminate(), which swallows it
    assert!(terminate_group(UNUSED_PID).is_err());
    assert!(terminate(UNUSED_PID).is_ok());
}
