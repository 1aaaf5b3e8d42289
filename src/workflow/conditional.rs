//! A binary branch over a predicate on [`Context`]

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::{EngineError, TaskError};
use crate::result::Outcome;
use chrono::Utc;
use std::sync::Arc;

/// A predicate evaluated against a [`Context`] to pick a branch.
pub trait Predicate: Send + Sync {
    fn evaluate(&self, ctx: &Context) -> Result<bool, TaskError>;
}

impl<F> Predicate for F
where
    F: Fn(&Context) -> Result<bool, TaskError> + Send + Sync,
{
    fn evaluate(&self, ctx: &Context) -> Result<bool, TaskError> {
        (self)(ctx)
    }
}

/// Evaluates `condition`, then executes `when_true` or `when_false`
/// (absent → no-op).
pub struct ConditionalWorkflow {
    pub(crate) name: String,
    condition: Arc<dyn Predicate>,
    when_true: Workflow,
    when_false: Option<Workflow>,
}

impl ConditionalWorkflow {
    pub fn new(
        name: impl Into<String>,
        condition: Arc<dyn Predicate>,
        when_true: Workflow,
        when_false: Option<Workflow>,
    ) -> Workflow {
        Workflow::new(NodeKind::Conditional(ConditionalWorkflow {
            name: name.into(),
            condition,
            when_true,
            when_false,
        }))
    }

    pub(crate) fn when_true(&self) -> &Workflow {
        &self.when_true
    }

    pub(crate) fn when_false(&self) -> Option<&Workflow> {
        self.when_false.as_ref()
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();

        let branch = match self.condition.evaluate(ctx) {
            Ok(true) => &Some(self.when_true.clone()),
            Ok(false) => &self.when_false,
            Err(err) => {
                return Outcome::failure(
                    started_at,
                    Utc::now(),
                    EngineError::TaskExecutionFailed {
                        task: self.name.clone(),
                        source: err,
                    },
                )
            }
        };

        match branch {
            Some(child) => child.execute(ctx, cancel).await,
            None => Outcome::skipped(started_at, Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{FnTask, TaskDescriptor};
    use crate::workflow::TaskWorkflow;

    fn marker_task(key: &'static str) -> Workflow {
        TaskWorkflow::new(TaskDescriptor::new(
            key,
            Arc::new(FnTask::new(key, move |ctx: &Context| {
                ctx.put(key, true);
                Ok(())
            })),
        ))
    }

    #[tokio::test]
    async fn true_branch_executes_when_true() {
        let wf = ConditionalWorkflow::new(
            "cond",
            Arc::new(|_: &Context| Ok(true)),
            marker_task("true_ran"),
            Some(marker_task("false_ran")),
        );
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        wf.execute(&ctx, &cancel).await;
        assert!(ctx.contains_key("true_ran"));
        assert!(!ctx.contains_key("false_ran"));
    }

    #[tokio::test]
    async fn missing_false_branch_is_skipped() {
        let wf = ConditionalWorkflow::new(
            "cond",
            Arc::new(|_: &Context| Ok(false)),
            marker_task("true_ran"),
            None,
        );
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        let outcome = wf.execute(&ctx, &cancel).await;
        assert_eq!(outcome.status(), crate::result::Status::Skipped);
    }

    #[tokio::test]
    async fn predicate_error_fails_the_node() {
        let wf = ConditionalWorkflow::new(
            "cond",
            Arc::new(|_: &Context| Err(TaskError::execution("bad predicate"))),
            marker_task("true_ran"),
            None,
        );
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        let outcome = wf.execute(&ctx, &cancel).await;
        assert!(outcome.is_failure());
    }
}
