//! Build execution lifecycle: start, poll to a terminal state, stop.
//!
//! The poll loop enforces a wall-clock deadline independent of poll count.
//! Abandoning the wait never stops the remote build; cleanup is the
//! caller's explicit decision via [`stop_build`].

use std::time::Duration;

use tokio::time::{Instant, sleep};

use al_core::traits::BuildRunner;
use al_core::types::{BuildSnapshot, BuildStatus};
use errors::BuildError;
use tracing::{info, warn};

/// Transient poll failures tolerated before the error escalates.
const MAX_POLL_FAILURES: u32 = 3;

/// Start exactly one build run; returns immediately with its id.
pub async fn start_build(runner: &dyn BuildRunner, project: &str) -> Result<String, BuildError> {
    let execution_id = runner.start_build(project).await?;
    info!(project, execution_id = %execution_id, "build started");
    Ok(execution_id)
}

/// Poll `execution_id` on a fixed interval until it reaches a terminal
/// state, logging phase transitions as they are observed.
///
/// Returns the final snapshot when the terminal status is success; any
/// other terminal status yields [`BuildError::Failed`] carrying it. On
/// timeout the remote build keeps running.
pub async fn await_completion(
    runner: &dyn BuildRunner,
    execution_id: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<BuildSnapshot, BuildError> {
    let deadline = Instant::now() + timeout;
    let mut last_phase = String::from("SUBMITTED");
    let mut consecutive_failures = 0u32;

    loop {
        match runner.build_snapshot(execution_id).await {
            Ok(snapshot) => {
                consecutive_failures = 0;
                if let Some(phase) = &snapshot.phase {
                    if *phase != last_phase {
                        info!(execution_id, phase = %phase, "build phase");
                        last_phase.clone_from(phase);
                    }
                }
                if snapshot.status.is_terminal() {
                    return finish(execution_id, snapshot);
                }
            }
            Err(err) => {
                consecutive_failures += 1;
                if consecutive_failures >= MAX_POLL_FAILURES {
                    return Err(err);
                }
                warn!(
                    execution_id,
                    attempt = consecutive_failures,
                    "status poll failed, retrying: {err}"
                );
            }
        }

        if Instant::now() + poll_interval > deadline {
            return Err(BuildError::Timeout {
                execution_id: execution_id.to_string(),
                timeout_secs: timeout.as_secs(),
                phase: last_phase,
            });
        }
        sleep(poll_interval).await;
    }
}

fn finish(execution_id: &str, snapshot: BuildSnapshot) -> Result<BuildSnapshot, BuildError> {
    match snapshot.status {
        BuildStatus::Succeeded => {
            info!(execution_id, "build succeeded");
            Ok(snapshot)
        }
        status => Err(BuildError::Failed {
            execution_id: execution_id.to_string(),
            status: status.to_string(),
            phase: snapshot
                .phase
                .clone()
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            logs: snapshot.logs_url,
        }),
    }
}

/// Explicitly stop a build. Stopping an already-terminal build is a no-op
/// success.
pub async fn stop_build(runner: &dyn BuildRunner, execution_id: &str) -> Result<(), BuildError> {
    runner.stop_build(execution_id).await?;
    info!(execution_id, "stop requested");
    Ok(())
}
