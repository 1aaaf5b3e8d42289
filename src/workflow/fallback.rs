//! Primary-then-fallback execution

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::EngineError;
use crate::result::Outcome;
use tracing::warn;

/// Executes `primary`; on failure, executes `fallback`. The fallback's
/// outcome becomes the node's outcome; `started_at` is the primary's
/// start, `completed_at` is the fallback's end.
pub struct FallbackWorkflow {
    pub(crate) name: String,
    primary: Workflow,
    fallback: Workflow,
}

impl FallbackWorkflow {
    pub fn new(name: impl Into<String>, primary: Workflow, fallback: Workflow) -> Workflow {
        Workflow::new(NodeKind::Fallback(FallbackWorkflow {
            name: name.into(),
            primary,
            fallback,
        }))
    }

    pub(crate) fn primary(&self) -> &Workflow {
        &self.primary
    }

    pub(crate) fn fallback(&self) -> &Workflow {
        &self.fallback
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let primary_outcome = self.primary.execute(ctx, cancel).await;
        if !primary_outcome.is_failure() {
            return primary_outcome;
        }

        warn!(fallback = %self.name, "primary failed, running fallback");
        let started_at = primary_outcome.started_at();
        let primary_error = primary_outcome
            .into_error()
            .unwrap_or(EngineError::Cancelled { unit: self.name.clone() });

        let fallback_outcome = self.fallback.execute(ctx, cancel).await;
        if fallback_outcome.is_success() || fallback_outcome.status().allows_continuation() {
            return fallback_outcome;
        }

        let completed_at = fallback_outcome.completed_at();
        let fallback_error = fallback_outcome
            .into_error()
            .unwrap_or(EngineError::Cancelled { unit: self.name.clone() });
        Outcome::failure(
            started_at,
            completed_at,
            EngineError::with_suppressed(fallback_error, vec![primary_error]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::retry::RetryPolicy;
    use crate::task::{FnTask, TaskDescriptor};
    use crate::workflow::TaskWorkflow;
    use std::sync::Arc;

    fn ok_task(key: &'static str) -> Workflow {
        TaskWorkflow::new(TaskDescriptor::new(
            key,
            Arc::new(FnTask::new(key, move |ctx: &Context| {
                ctx.put(key, true);
                Ok(())
            })),
        ))
    }

    fn failing_task() -> Workflow {
        TaskWorkflow::new(
            TaskDescriptor::new(
                "fails",
                Arc::new(FnTask::new("fails", |_ctx: &Context| {
                    Err(TaskError::execution("primary broke"))
                })),
            )
            .with_retry_policy(RetryPolicy::none()),
        )
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let wf = FallbackWorkflow::new("fb", ok_task("primary_ran"), ok_task("fallback_ran"));
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        let outcome = wf.execute(&ctx, &cancel).await;
        assert!(outcome.is_success());
        assert!(!ctx.contains_key("fallback_ran"));
    }

    #[tokio::test]
    async fn primary_failure_runs_fallback() {
        let wf = FallbackWorkflow::new("fb", failing_task(), ok_task("fallback_ran"));
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        let outcome = wf.execute(&ctx, &cancel).await;
        assert!(outcome.is_success());
        assert!(ctx.contains_key("fallback_ran"));
    }

    #[tokio::test]
    async fn both_fail_preserves_primary_as_suppressed() {
        let wf = FallbackWorkflow::new("fb", failing_task(), failing_task());
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        let outcome = wf.execute(&ctx, &cancel).await;
        assert!(outcome.is_failure());
        assert!(outcome.error().unwrap().to_string().contains("suppressed"));
    }
}
