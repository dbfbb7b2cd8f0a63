//! Concurrent load against a single StateController
//!
//! Each task writes and reads back its own private key and also hammers one
//! shared key. Afterwards every private key must hold the last value its task
//! wrote and the shared key must hold some task's final value.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::state::{StateController, StateError};

/// Key every task writes to
pub const SHARED_KEY: &str = "shared";

/// Result of a stress run
#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    pub tasks: usize,
    pub ops_per_task: usize,
    /// Writes plus reads issued across all tasks
    pub total_ops: usize,
    /// Private reads that did not see the task's own preceding write
    pub read_your_writes_violations: usize,
    /// Private keys whose final value was not the task's last write
    pub lost_updates: usize,
    /// Whether the shared key ended on some task's final write
    pub shared_key_consistent: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl StressReport {
    /// True when no anomaly was observed
    pub fn is_clean(&self) -> bool {
        self.read_your_writes_violations == 0 && self.lost_updates == 0 && self.shared_key_consistent
    }
}

/// Requests issued by a run: two writes and one read per round
fn total_ops(tasks: usize, ops: usize) -> usize {
    tasks.saturating_mul(ops).saturating_mul(3)
}

fn private_key(task: usize) -> String {
    format!("task-{}", task)
}

/// Run `tasks` concurrent callers doing `ops` write/read rounds each
///
/// The controller must already be running.
pub async fn run_stress(
    controller: &StateController<Value>,
    tasks: usize,
    ops: usize,
) -> Result<StressReport, StateError> {
    debug!(tasks, ops, "run_stress: called");
    let started = Instant::now();
    let mut handles = Vec::with_capacity(tasks);

    for task in 0..tasks {
        let controller = controller.clone();
        handles.push(tokio::spawn(async move {
            let key = private_key(task);
            let mut violations = 0usize;
            for op in 0..ops {
                let value = json!({ "task": task, "op": op });
                controller.write(key.clone(), value.clone()).await?;
                controller.write(SHARED_KEY, value.clone()).await?;
                if controller.read(key.clone()).await?.as_ref() != Some(&value) {
                    violations += 1;
                }
            }
            Ok::<usize, StateError>(violations)
        }));
    }

    let mut read_your_writes_violations = 0;
    for handle in handles {
        // JoinError only on panic
        read_your_writes_violations += handle.await.map_err(|_| StateError::Disconnected)??;
    }

    let mut lost_updates = 0;
    for task in 0..tasks {
        let expected = json!({ "task": task, "op": ops.saturating_sub(1) });
        if ops > 0 && controller.read(private_key(task)).await? != Some(expected) {
            lost_updates += 1;
        }
    }

    let shared_key_consistent = match controller.read(SHARED_KEY).await? {
        Some(value) => value.get("op").and_then(Value::as_u64) == Some(ops.saturating_sub(1) as u64),
        None => tasks == 0 || ops == 0,
    };

    let report = StressReport {
        tasks,
        ops_per_task: ops,
        total_ops: total_ops(tasks, ops),
        read_your_writes_violations,
        lost_updates,
        shared_key_consistent,
        elapsed: started.elapsed(),
    };
    info!(?report, "Stress run finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_small_stress_is_clean() {
        let controller = StateController::<Value>::default();
        controller.start().await.unwrap();

        let report = run_stress(&controller, 4, 25).await.unwrap();
        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(report.total_ops, 4 * 25 * 3);

        controller.stop().await.unwrap();
    }

    #[test]
    fn test_total_ops_saturates() {
        assert_eq!(total_ops(4, 25), 300);
        assert_eq!(total_ops(usize::MAX, 2), usize::MAX);
        assert_eq!(total_ops(usize::MAX / 2, 1), usize::MAX);
    }

    #[tokio::test]
    async fn test_stress_requires_running_controller() {
        let controller = StateController::<Value>::default();
        assert!(run_stress(&controller, 2, 2).await.is_err());
    }
}
