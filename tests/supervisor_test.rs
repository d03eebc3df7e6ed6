//! Integration tests for the detector supervisor.
//!
//! These spawn real processes through `sh`, so they only run on Unix and are
//! serialized to keep process counts predictable.

#![cfg(unix)]

use robin::config::SupervisorConfig;
use robin::supervisor::DetectionSupervisor;
use robin::{Error, ErrorKind};
use serial_test::serial;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn sh(script: &str, arg: &Path) -> SupervisorConfig {
    SupervisorConfig {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            script.to_string(),
            arg.to_string_lossy().into_owned(),
        ],
        grace_period_secs: 1,
        ..SupervisorConfig::default()
    }
}

/// Poll `check` every 20ms for up to 5s.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Whether `pid` is gone or only a zombie awaiting reaping.
fn is_dead(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return true;
    };
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .is_some_and(|state| state == "Z" || state == "X")
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[tokio::test]
#[serial]
async fn test_double_start_is_rejected() {
    let dir = TempDir::new().unwrap();
    let supervisor = DetectionSupervisor::new(sh("exec sleep 30", dir.path()));

    let first = supervisor.start().await.unwrap();
    let err = supervisor.start().await.unwrap_err();

    let pid = first.pid.unwrap();
    assert!(matches!(err, Error::AlreadyRunning { pid: p } if p == pid));
    assert_eq!(err.kind(), ErrorKind::ProcessState);

    let status = supervisor.status().await;
    assert!(status.running);
    assert_eq!(status.pid, Some(pid));

    supervisor.stop().await.unwrap();
    assert!(!supervisor.status().await.running);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_starts_spawn_once() {
    let dir = TempDir::new().unwrap();
    let spawned = dir.path().join("spawned");
    let supervisor = Arc::new(DetectionSupervisor::new(sh(
        r#"echo $$ >> "$0"; exec sleep 30"#,
        &spawned,
    )));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move { supervisor.start().await })
        })
        .collect();

    let mut started = Vec::new();
    let mut rejected = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(status) => started.push(status.pid.unwrap()),
            Err(Error::AlreadyRunning { pid }) => rejected.push(pid),
            Err(other) => panic!("unexpected start error: {other}"),
        }
    }

    assert_eq!(started.len(), 1);
    assert_eq!(rejected.len(), 7);
    assert!(rejected.iter().all(|&pid| pid == started[0]));

    assert!(eventually(|| read_pid(&spawned).is_some()).await);
    let lines = std::fs::read_to_string(&spawned).unwrap();
    assert_eq!(lines.lines().count(), 1);

    supervisor.stop().await.unwrap();
    assert!(is_dead(started[0]));
}

#[tokio::test]
#[serial]
async fn test_stop_without_start_is_not_running() {
    let dir = TempDir::new().unwrap();
    let supervisor = DetectionSupervisor::new(sh("exec sleep 30", dir.path()));

    let err = supervisor.stop().await.unwrap_err();
    assert!(matches!(err, Error::NotRunning));
    assert_eq!(err.kind(), ErrorKind::ProcessState);
}

#[tokio::test]
#[serial]
async fn test_stop_terminates_descendants() {
    let dir = TempDir::new().unwrap();
    let pid_file = dir.path().join("grandchild.pid");
    let supervisor = DetectionSupervisor::new(sh(
        r#"sleep 30 & echo $! > "$0"; wait"#,
        &pid_file,
    ));

    let leader = supervisor.start().await.unwrap().pid.unwrap();
    assert!(eventually(|| read_pid(&pid_file).is_some()).await);
    let grandchild = read_pid(&pid_file).unwrap();
    assert!(!is_dead(grandchild));

    supervisor.stop().await.unwrap();

    assert!(is_dead(leader));
    assert!(eventually(|| is_dead(grandchild)).await);
    assert!(!supervisor.status().await.running);

    // Stopped again is an error, starting again works
    assert!(matches!(supervisor.stop().await, Err(Error::NotRunning)));
    supervisor.start().await.unwrap();
    supervisor.stop().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_stop_escalates_when_sigterm_ignored() {
    let dir = TempDir::new().unwrap();
    let supervisor = DetectionSupervisor::new(sh(
        r#"trap '' TERM; while :; do sleep 1; done"#,
        dir.path(),
    ));

    let pid = supervisor.start().await.unwrap().pid.unwrap();
    // Give sh time to install the trap
    tokio::time::sleep(Duration::from_millis(200)).await;

    supervisor.stop().await.unwrap();

    assert!(is_dead(pid));
}

#[tokio::test]
#[serial]
async fn test_exited_detector_reports_stopped() {
    let dir = TempDir::new().unwrap();
    let supervisor = DetectionSupervisor::new(sh("exit 0", dir.path()));

    supervisor.start().await.unwrap();

    assert!(
        eventually_async(&supervisor, |running| !running).await,
        "detector should be reported stopped after exiting"
    );
    assert!(matches!(supervisor.stop().await, Err(Error::NotRunning)));
}

#[tokio::test]
#[serial]
async fn test_restarts_after_unexpected_exit() {
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("runs");
    // First run fails, later runs stay up
    let mut config = sh(
        r#"echo run >> "$0"; [ "$(wc -l < "$0")" -ge 2 ] && exec sleep 30; exit 1"#,
        &counter,
    );
    config.max_restarts = 3;
    config.restart_backoff_ms = 10;
    config.restart_backoff_max_ms = 50;
    let supervisor = DetectionSupervisor::new(config);

    let first = supervisor.start().await.unwrap().pid.unwrap();

    let mut status = supervisor.status().await;
    for _ in 0..250 {
        if status.restarts == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        status = supervisor.status().await;
    }

    assert!(status.running);
    assert_eq!(status.restarts, 1);
    assert_ne!(status.pid, Some(first));

    supervisor.stop().await.unwrap();
    assert!(!supervisor.status().await.running);
}

async fn eventually_async(
    supervisor: &DetectionSupervisor,
    check: impl Fn(bool) -> bool,
) -> bool {
    for _ in 0..250 {
        if check(supervisor.status().await.running) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
