//! Detector spawning, monitoring and process-group termination.

use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// State shared between the supervisor and its monitor task.
#[derive(Debug, Clone, Copy)]
pub(super) struct MonitorState {
    pub pid: u32,
    pub restarts: u32,
    pub alive: bool,
}

/// Spawn the detector as the leader of a new process group.
pub(super) fn spawn_detector(config: &SupervisorConfig) -> Result<Child> {
    let mut command = Command::new(&config.program);
    command
        .args(&config.args)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    if let Some(dir) = &config.working_dir {
        command.current_dir(dir);
    }

    #[cfg(unix)]
    command.process_group(0);

    command.spawn().map_err(|source| Error::DetectorSpawn {
        program: config.program.clone(),
        source,
    })
}

/// Delay before restart number `attempt` (0-based).
pub(super) fn restart_delay(config: &SupervisorConfig, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let ms = config
        .restart_backoff_ms
        .saturating_mul(factor)
        .min(config.restart_backoff_max_ms);
    Duration::from_millis(ms)
}

/// Watch the detector until cancelled, restarting it on unexpected exit.
///
/// Returns once the detector is terminated after cancellation, or once it
/// has exited and no restarts remain.
pub(super) async fn supervise(
    mut child: Child,
    config: SupervisorConfig,
    state: Arc<Mutex<MonitorState>>,
    cancel: CancellationToken,
) -> Result<()> {
    let mark_dead = || {
        state.lock().unwrap_or_else(PoisonError::into_inner).alive = false;
    };

    loop {
        let exited = tokio::select! {
            () = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };

        let Some(status) = exited else {
            let result = terminate(&mut child, config.grace_period_secs).await;
            mark_dead();
            return result;
        };

        let (pid, restarts) = {
            let s = state.lock().unwrap_or_else(PoisonError::into_inner);
            (s.pid, s.restarts)
        };
        match status {
            Ok(status) => warn!("Detector (pid {pid}) exited unexpectedly: {status}"),
            Err(e) => warn!("Failed to wait on detector (pid {pid}): {e}"),
        }
        // Leftovers from the dead detector's group
        #[cfg(unix)]
        let _ = signal_group(pid, libc::SIGKILL);

        if restarts >= config.max_restarts {
            mark_dead();
            return Ok(());
        }

        let delay = restart_delay(&config, restarts);
        warn!(
            "Restarting detector in {}ms (restart {} of {})",
            delay.as_millis(),
            restarts + 1,
            config.max_restarts
        );

        tokio::select! {
            () = cancel.cancelled() => {
                mark_dead();
                return Ok(());
            }
            () = tokio::time::sleep(delay) => {}
        }

        child = match spawn_detector(&config).and_then(|c| require_pid(c, &config)) {
            Ok((child, new_pid)) => {
                let mut s = state.lock().unwrap_or_else(PoisonError::into_inner);
                s.pid = new_pid;
                s.restarts += 1;
                info!("Detector restarted (pid {new_pid})");
                child
            }
            Err(e) => {
                error!("Failed to restart detector: {e}");
                mark_dead();
                return Ok(());
            }
        };
    }
}

fn require_pid(child: Child, config: &SupervisorConfig) -> Result<(Child, u32)> {
    let pid = child.id().ok_or_else(|| Error::DetectorSpawn {
        program: config.program.clone(),
        source: std::io::Error::other("detector exited before its pid was known"),
    })?;
    Ok((child, pid))
}

/// SIGTERM the detector's group, escalating to SIGKILL after the grace period.
#[cfg(unix)]
async fn terminate(child: &mut Child, grace_period_secs: u64) -> Result<()> {
    let Some(pid) = child.id() else {
        // Already reaped
        return Ok(());
    };
    let failed = |source| Error::DetectorTerminate { pid, source };

    signal_group(pid, libc::SIGTERM).map_err(failed)?;

    let grace = Duration::from_secs(grace_period_secs);
    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        warn!("Detector (pid {pid}) ignored SIGTERM for {grace_period_secs}s, killing");
    }

    // Descendants that outlived the leader still share its group
    signal_group(pid, libc::SIGKILL).map_err(failed)?;
    child.wait().await.map_err(failed)?;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child, _grace_period_secs: u64) -> Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let failed = |source| Error::DetectorTerminate { pid, source };
    child.start_kill().map_err(failed)?;
    child.wait().await.map_err(failed)?;
    Ok(())
}

/// Send `signal` to process group `pgid`. A group that no longer exists is
/// not an error.
#[cfg(unix)]
#[allow(unsafe_code)]
fn signal_group(pgid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;

    // SAFETY: killpg only takes integer arguments and does not touch memory.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}
