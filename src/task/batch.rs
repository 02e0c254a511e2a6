// src/task/batch.rs

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{BuildError, Result};
use crate::task::cancel::CancelToken;
use crate::task::handle::TaskHandle;

/// Result of a fully successful batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Task names in the order they settled.
    pub completed: Vec<String>,
}

struct TaskSettled {
    name: String,
    result: Result<()>,
}

/// Ordered collection of every task produced for one invocation.
///
/// Builders push into the batch synchronously; nothing runs until
/// [`settle`](Self::settle) is awaited.
#[derive(Debug)]
pub struct TaskBatch {
    tasks: Vec<TaskHandle>,
    cancel: CancelToken,
}

impl TaskBatch {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            tasks: Vec::new(),
            cancel,
        }
    }

    pub fn push(&mut self, task: TaskHandle) {
        debug!(task = %task.name(), "task queued in batch");
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(TaskHandle::name).collect()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run every task concurrently and wait for the aggregate outcome.
    ///
    /// - Succeeds once every member resolved.
    /// - Fails as soon as the first member fails, wrapped in
    ///   [`BuildError::TaskFailed`]. Siblings are not stopped; they keep
    ///   running in the background.
    /// - Cancelling the batch token stops every member still in flight and
    ///   fails the batch with [`BuildError::Cancelled`].
    pub async fn settle(self) -> Result<BatchReport> {
        let total = self.tasks.len();
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskSettled>();

        for task in self.tasks {
            let (name, future) = task.into_parts();
            let cancel = self.cancel.clone();
            let tx = tx.clone();

            let handle = tokio::spawn(async move {
                tokio::select! {
                    result = future => result,
                    _ = cancel.cancelled() => Err(BuildError::Cancelled),
                }
            });

            tokio::spawn(async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(BuildError::TaskPanicked {
                        task: name.clone(),
                        message: join_err.to_string(),
                    }),
                };
                let _ = tx.send(TaskSettled { name, result });
            });
        }
        drop(tx);

        let mut report = BatchReport::default();
        while report.completed.len() < total {
            let settled = tokio::select! {
                settled = rx.recv() => settled,
                _ = self.cancel.cancelled() => return Err(BuildError::Cancelled),
            };
            let Some(TaskSettled { name, result }) = settled else {
                return Err(BuildError::ContractViolation(format!(
                    "batch lost track of {} task(s)",
                    total - report.completed.len()
                )));
            };

            match result {
                Ok(()) => {
                    debug!(task = %name, "batch member resolved");
                    report.completed.push(name);
                }
                Err(err @ BuildError::TaskPanicked { .. }) => return Err(err),
                Err(BuildError::Cancelled) => return Err(BuildError::Cancelled),
                Err(err) => {
                    let remaining = total - report.completed.len() - 1;
                    warn!(
                        task = %name,
                        remaining,
                        "batch member failed; remaining tasks keep running"
                    );
                    return Err(BuildError::TaskFailed {
                        task: name,
                        source: Box::new(err),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn ok(name: &str, delay_ms: u64) -> TaskHandle {
        TaskHandle::new(name, async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(())
        })
    }

    #[tokio::test]
    async fn empty_batch_succeeds() {
        let batch = TaskBatch::new(CancelToken::new());
        let report = batch.settle().await.unwrap();
        assert!(report.completed.is_empty());
    }

    #[tokio::test]
    async fn all_members_resolving_reports_success_in_settle_order() {
        let mut batch = TaskBatch::new(CancelToken::new());
        batch.push(ok("slow", 30));
        batch.push(ok("fast", 0));
        assert_eq!(batch.names(), vec!["slow", "fast"]);

        let report = batch.settle().await.unwrap();
        assert_eq!(report.completed, vec!["fast".to_string(), "slow".to_string()]);
    }

    #[tokio::test]
    async fn first_failure_fails_batch_and_siblings_keep_running() {
        let sibling_done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&sibling_done);

        let mut batch = TaskBatch::new(CancelToken::new());
        batch.push(TaskHandle::new("sibling", async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }));
        batch.push(TaskHandle::new("broken", async {
            Err(BuildError::Compile("syntax error".to_string()))
        }));

        let err = batch.settle().await.unwrap_err();
        assert_eq!(err.failed_task(), Some("broken"));
        assert!(matches!(err.root_cause(), BuildError::Compile(_)));
        assert!(!sibling_done.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sibling_done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_member_is_reported() {
        let mut batch = TaskBatch::new(CancelToken::new());
        batch.push(TaskHandle::new("explodes", async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        }));
        let err = batch.settle().await.unwrap_err();
        assert!(matches!(err, BuildError::TaskPanicked { ref task, .. } if task == "explodes"));
    }

    #[tokio::test]
    async fn cancelling_stops_in_flight_members() {
        let cancel = CancelToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let mut batch = TaskBatch::new(cancel.clone());
        batch.push(TaskHandle::new("forever", async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }));

        let settle = tokio::spawn(batch.settle());
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), settle)
            .await
            .expect("settle should return after cancel")
            .expect("settle should not panic");
        assert!(matches!(result, Err(BuildError::Cancelled)));
        assert!(!finished.load(Ordering::SeqCst));
    }
}
