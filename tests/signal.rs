#![cfg(unix)]

use assert_cmd::prelude::*;
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

fn spawn_bf(args: &[&str]) -> Child {
    Command::cargo_bin("bf")
        .unwrap()
        .args(args)
        .env("BF_NO_CONFIG", "1")
        .env_remove("BF_MAX_STEPS")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

fn sigint(child: &Child) {
    let status = Command::new("kill").args(["-INT", &child.id().to_string()]).status().unwrap();
    assert!(status.success());
}

fn wait_for(child: &mut Child, limit: Duration) -> Option<i32> {
    let started = Instant::now();
    while started.elapsed() < limit {
        if let Some(status) = child.try_wait().unwrap() {
            return status.code();
        }
        sleep(Duration::from_millis(20));
    }
    let _ = child.kill();
    let _ = child.wait();
    panic!("bf still running {limit:?} after SIGINT");
}

#[test]
fn second_sigint_exits_while_blocked_on_input() {
    // stdin stays open, so ',' blocks with stdout locked by the main thread.
    let mut child = spawn_bf(&["run", "-e", ",."]);
    sleep(Duration::from_millis(300));
    sigint(&child);
    sleep(Duration::from_millis(300));
    sigint(&child);
    assert_eq!(wait_for(&mut child, Duration::from_secs(3)), Some(130));
}

#[test]
fn sigint_during_execution_exits_130() {
    let mut child = spawn_bf(&["run", "-e", "+[]"]);
    sleep(Duration::from_millis(300));
    sigint(&child);
    assert_eq!(wait_for(&mut child, Duration::from_secs(3)), Some(130));
}
