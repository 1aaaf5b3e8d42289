//! Switch-case branching over a selector value

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::{EngineError, TaskError};
use crate::result::Outcome;
use chrono::Utc;
use std::sync::Arc;

/// Computes the branch key to select, evaluated against a [`Context`].
pub trait Selector: Send + Sync {
    fn select(&self, ctx: &Context) -> Result<String, TaskError>;
}

impl<F> Selector for F
where
    F: Fn(&Context) -> Result<String, TaskError> + Send + Sync,
{
    fn select(&self, ctx: &Context) -> Result<String, TaskError> {
        (self)(ctx)
    }
}

/// Evaluates `selector`, looks the result up in an ordered `branches` map,
/// and executes the match (or `default_branch`, or skips).
pub struct DynamicBranchingWorkflow {
    pub(crate) name: String,
    selector: Arc<dyn Selector>,
    /// Insertion-ordered: rendering depends on this order, not a sorted one.
    branches: Vec<(String, Workflow)>,
    default_branch: Option<Workflow>,
}

impl DynamicBranchingWorkflow {
    pub fn new(
        name: impl Into<String>,
        selector: Arc<dyn Selector>,
        branches: Vec<(String, Workflow)>,
        default_branch: Option<Workflow>,
    ) -> Workflow {
        Workflow::new(NodeKind::Switch(DynamicBranchingWorkflow {
            name: name.into(),
            selector,
            branches,
            default_branch,
        }))
    }

    pub(crate) fn branches(&self) -> &[(String, Workflow)] {
        &self.branches
    }

    pub(crate) fn default_branch(&self) -> Option<&Workflow> {
        self.default_branch.as_ref()
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();

        let key = match self.selector.select(ctx) {
            Ok(key) => key,
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

        let matched = self.branches.iter().find(|(k, _)| *k == key).map(|(_, w)| w);

        match matched.or(self.default_branch.as_ref()) {
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

    fn selector(value: &'static str) -> Arc<dyn Selector> {
        Arc::new(move |_: &Context| Ok(value.to_string()))
    }

    #[tokio::test]
    async fn matches_first_branch_by_key() {
        let wf = DynamicBranchingWorkflow::new(
            "sw",
            selector("b"),
            vec![
                ("a".to_string(), marker_task("a_ran")),
                ("b".to_string(), marker_task("b_ran")),
            ],
            None,
        );
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        wf.execute(&ctx, &cancel).await;
        assert!(ctx.contains_key("b_ran"));
        assert!(!ctx.contains_key("a_ran"));
    }

    #[tokio::test]
    async fn falls_back_to_default_on_no_match() {
        let wf = DynamicBranchingWorkflow::new(
            "sw",
            selector("z"),
            vec![("a".to_string(), marker_task("a_ran"))],
            Some(marker_task("default_ran")),
        );
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        wf.execute(&ctx, &cancel).await;
        assert!(ctx.contains_key("default_ran"));
    }

    #[tokio::test]
    async fn no_match_no_default_is_skipped() {
        let wf = DynamicBranchingWorkflow::new(
            "sw",
            selector("z"),
            vec![("a".to_string(), marker_task("a_ran"))],
            None,
        );
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        let outcome = wf.execute(&ctx, &cancel).await;
        assert_eq!(outcome.status(), crate::result::Status::Skipped);
    }
}
