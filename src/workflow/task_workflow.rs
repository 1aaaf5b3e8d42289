//! Adapter wrapping a single [`Task`] with retry and timeout policies
//!

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::{EngineError, TaskError, TaskErrorKind};
use crate::result::Outcome;
use crate::task::TaskDescriptor;
use chrono::Utc;
use tracing::{debug, info, warn};

enum Attempt {
    Success,
    Cancelled,
    Timeout,
    TaskFailed(TaskError),
}

/// Wraps a [`crate::task::Task`] with resilience policies, adapting it to
/// the [`Workflow`] contract
pub struct TaskWorkflow {
    pub(crate) name: String,
    descriptor: TaskDescriptor,
}

impl TaskWorkflow {
    /// Builds a `TaskWorkflow` from a [`TaskDescriptor`].
    pub fn new(descriptor: TaskDescriptor) -> Workflow {
        let name = descriptor.name.clone();
        Workflow::new(NodeKind::Task(TaskWorkflow { name, descriptor }))
    }

    async fn attempt(&self, ctx: &Context, cancel: &CancellationToken) -> Attempt {
        let exec = self.descriptor.task.execute(ctx);
        let timed = async {
            match self.descriptor.timeout_policy.limit() {
                Some(limit) => match tokio::time::timeout(limit, exec).await {
                    Ok(Ok(())) => Attempt::Success,
                    Ok(Err(e)) => Attempt::TaskFailed(e),
                    Err(_) => Attempt::Timeout,
                },
                None => match exec.await {
                    Ok(()) => Attempt::Success,
                    Err(e) => Attempt::TaskFailed(e),
                },
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Attempt::Cancelled,
            result = timed => result,
        }
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();
        let mut attempt_number: u32 = 0;

        loop {
            attempt_number += 1;
            debug!(task = %self.name, attempt = attempt_number, "executing task");

            match self.attempt(ctx, cancel).await {
                Attempt::Success => {
                    info!(task = %self.name, attempt = attempt_number, "task succeeded");
                    return Outcome::success(started_at, Utc::now());
                }
                Attempt::Cancelled => {
                    warn!(task = %self.name, "task cancelled");
                    return Outcome::failure(
                        started_at,
                        Utc::now(),
                        EngineError::Cancelled {
                            unit: self.name.clone(),
                        },
                    );
                }
                Attempt::Timeout => {
                    let limit_ms = self
                        .descriptor
                        .timeout_policy
                        .limit()
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or(0);
                    let err = EngineError::Timeout {
                        unit: self.name.clone(),
                        limit_ms,
                    };
                    if self.should_retry_and_wait(attempt_number, &err, cancel).await {
                        continue;
                    }
                    warn!(task = %self.name, attempt = attempt_number, "task timed out");
                    return Outcome::failure(started_at, Utc::now(), err);
                }
                Attempt::TaskFailed(task_err) => {
                    let err = self.classify(task_err);
                    if self.should_retry_and_wait(attempt_number, &err, cancel).await {
                        continue;
                    }
                    warn!(task = %self.name, attempt = attempt_number, error = %err, "task failed");
                    return Outcome::failure(started_at, Utc::now(), err);
                }
            }
        }
    }

    fn classify(&self, source: TaskError) -> EngineError {
        match source.kind {
            TaskErrorKind::Validation => EngineError::TaskValidationFailed {
                task: self.name.clone(),
                source,
            },
            TaskErrorKind::Execution => EngineError::TaskExecutionFailed {
                task: self.name.clone(),
                source,
            },
        }
    }

    /// Returns `true` if the caller should retry (after having slept the
    /// computed backoff). The delay is computed from attempt N's failure
    /// and elapses before attempt N+1 begins
    async fn should_retry_and_wait(
        &self,
        attempt_number: u32,
        err: &EngineError,
        cancel: &CancellationToken,
    ) -> bool {
        if !self.descriptor.retry_policy.should_retry(attempt_number, err) {
            return false;
        }
        let delay = self.descriptor.retry_policy.compute_delay(attempt_number);
        if delay.is_zero() {
            return true;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
