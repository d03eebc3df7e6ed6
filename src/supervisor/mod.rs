//! Lifecycle management for the external detector program.
//!
//! The detector is a long-running child process. [`DetectionSupervisor`]
//! guarantees at most one instance, restarts it after unexpected exits when
//! configured to, and tears down its whole process group on stop.

mod process;

use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use process::{MonitorState, spawn_detector, supervise};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Snapshot of the detector lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectionStatus {
    /// Whether a detector process is alive.
    pub running: bool,
    /// Pid of the live detector, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Restarts performed since the last `start`.
    pub restarts: u32,
}

impl DetectionStatus {
    const STOPPED: Self = Self {
        running: false,
        pid: None,
        restarts: 0,
    };
}

struct ProcessHandle {
    state: Arc<Mutex<MonitorState>>,
    cancel: CancellationToken,
    monitor: JoinHandle<Result<()>>,
}

impl ProcessHandle {
    fn snapshot(&self) -> MonitorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Starts, stops and reports on the detector process.
pub struct DetectionSupervisor {
    config: SupervisorConfig,
    handle: tokio::sync::Mutex<Option<ProcessHandle>>,
}

impl DetectionSupervisor {
    /// Create a supervisor in the stopped state.
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Spawn the detector.
    ///
    /// Fails with [`Error::AlreadyRunning`] without side effects when a live
    /// detector is already tracked.
    pub async fn start(&self) -> Result<DetectionStatus> {
        let mut slot = self.handle.lock().await;
        reap_if_dead(&mut slot).await;

        if let Some(handle) = slot.as_ref() {
            return Err(Error::AlreadyRunning {
                pid: handle.snapshot().pid,
            });
        }

        let child = spawn_detector(&self.config)?;
        let pid = child.id().ok_or_else(|| Error::DetectorSpawn {
            program: self.config.program.clone(),
            source: std::io::Error::other("detector exited before its pid was known"),
        })?;
        info!("Started detector '{}' (pid {pid})", self.config.program);

        let state = Arc::new(Mutex::new(MonitorState {
            pid,
            restarts: 0,
            alive: true,
        }));
        let cancel = CancellationToken::new();
        let monitor = tokio::spawn(supervise(
            child,
            self.config.clone(),
            Arc::clone(&state),
            cancel.clone(),
        ));

        *slot = Some(ProcessHandle {
            state,
            cancel,
            monitor,
        });

        Ok(DetectionStatus {
            running: true,
            pid: Some(pid),
            restarts: 0,
        })
    }

    /// Terminate the detector and all of its descendants.
    ///
    /// Fails with [`Error::NotRunning`] when nothing is tracked. A tracked
    /// detector that has already exited counts as stopped successfully.
    pub async fn stop(&self) -> Result<()> {
        let mut slot = self.handle.lock().await;
        let handle = slot.take().ok_or(Error::NotRunning)?;
        let pid = handle.snapshot().pid;

        handle.cancel.cancel();
        let result = handle.monitor.await.map_err(|e| Error::TaskJoin {
            reason: e.to_string(),
        })?;

        match &result {
            Ok(()) => info!("Stopped detector (pid {pid})"),
            Err(e) => debug!("Detector stop reported: {e}"),
        }
        result
    }

    /// Current lifecycle state.
    pub async fn status(&self) -> DetectionStatus {
        let mut slot = self.handle.lock().await;
        reap_if_dead(&mut slot).await;

        slot.as_ref().map_or(DetectionStatus::STOPPED, |handle| {
            let state = handle.snapshot();
            DetectionStatus {
                running: true,
                pid: Some(state.pid),
                restarts: state.restarts,
            }
        })
    }
}

/// Clear a handle whose monitor has given up on the detector.
async fn reap_if_dead(slot: &mut Option<ProcessHandle>) {
    let dead = slot.as_ref().is_some_and(|h| !h.snapshot().alive);
    if !dead {
        return;
    }
    if let Some(handle) = slot.take() {
        debug!("Detector exited on its own (pid {})", handle.snapshot().pid);
        // Monitor has already returned; this only collects its result
        let _ = handle.monitor.await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(program: &str, args: &[&str]) -> SupervisorConfig {
        SupervisorConfig {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            grace_period_secs: 1,
            ..SupervisorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_stop_without_start_is_not_running() {
        let supervisor = DetectionSupervisor::new(config("sleep", &["30"]));
        assert!(matches!(supervisor.stop().await, Err(Error::NotRunning)));
    }

    #[tokio::test]
    async fn test_initial_status_is_stopped() {
        let supervisor = DetectionSupervisor::new(config("sleep", &["30"]));
        assert_eq!(supervisor.status().await, DetectionStatus::STOPPED);
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_supervisor_stopped() {
        let supervisor =
            DetectionSupervisor::new(config("/nonexistent/robin-detector", &[]));
        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, Error::DetectorSpawn { .. }));
        assert!(!supervisor.status().await.running);
    }

    #[test]
    fn test_status_serializes_without_pid_when_stopped() {
        let json = serde_json::to_string(&DetectionStatus::STOPPED).unwrap();
        assert_eq!(json, r#"{"running":false,"restarts":0}"#);
    }
}
