//! Concurrent children with fail-fast or wait-all aggregation
//!

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::EngineError;
use crate::result::Outcome;
use crate::scheduling::{Scheduler, TokioScheduler};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs its children concurrently on an injected [`Scheduler`].
pub struct ParallelWorkflow {
    pub(crate) name: String,
    children: Vec<Workflow>,
    share_context: bool,
    fail_fast: bool,
    scheduler: Arc<dyn Scheduler>,
}

impl ParallelWorkflow {
    /// Builds a `ParallelWorkflow` with `shareContext = false`,
    /// `failFast = true`, and the default Tokio scheduler.
    pub fn new(name: impl Into<String>, children: Vec<Workflow>) -> Workflow {
        Self::with_scheduler(name, children, Arc::new(TokioScheduler))
    }

    pub fn with_scheduler(
        name: impl Into<String>,
        children: Vec<Workflow>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Workflow {
        Workflow::new(NodeKind::Parallel(ParallelWorkflow {
            name: name.into(),
            children,
            share_context: false,
            fail_fast: true,
            scheduler,
        }))
    }

    pub fn share_context(self_workflow: Workflow, share_context: bool) -> Workflow {
        Self::map(self_workflow, |n| n.share_context = share_context)
    }

    pub fn fail_fast(self_workflow: Workflow, fail_fast: bool) -> Workflow {
        Self::map(self_workflow, |n| n.fail_fast = fail_fast)
    }

    fn map(workflow: Workflow, f: impl FnOnce(&mut ParallelWorkflow)) -> Workflow {
        match &*workflow.0 {
            NodeKind::Parallel(n) => {
                let mut cloned = ParallelWorkflow {
                    name: n.name.clone(),
                    children: n.children.clone(),
                    share_context: n.share_context,
                    fail_fast: n.fail_fast,
                    scheduler: Arc::clone(&n.scheduler),
                };
                f(&mut cloned);
                Workflow::new(NodeKind::Parallel(cloned))
            }
            _ => workflow,
        }
    }

    pub(crate) fn children(&self) -> &[Workflow] {
        &self.children
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();

        if self.children.is_empty() {
            return Outcome::success(started_at, Utc::now());
        }

        let child_cancel = cancel.child();
        let mut handles = Vec::with_capacity(self.children.len());

        for child in &self.children {
            let child = child.clone();
            let child_ctx = if self.share_context { ctx.share() } else { ctx.fork() };
            let child_cancel = child_cancel.clone();
            let fut: futures::future::BoxFuture<'static, Outcome> =
                Box::pin(async move { child.execute(&child_ctx, &child_cancel).await });
            handles.push(self.scheduler.submit(fut));
        }

        let mut in_flight: FuturesUnordered<futures::future::BoxFuture<'static, Outcome>> =
            FuturesUnordered::new();
        for handle in handles {
            let unit = self.name.clone();
            in_flight.push(Box::pin(async move {
                match handle.join().await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let now = Utc::now();
                        Outcome::failure(now, now, EngineError::Cancelled { unit })
                    }
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(in_flight.len());
        while let Some(outcome) = in_flight.next().await {
            let is_failure = outcome.is_failure();
            outcomes.push(outcome);
            if self.fail_fast && is_failure {
                child_cancel.cancel();
            }
        }

        let failures: Vec<&Outcome> = outcomes.iter().filter(|o| o.is_failure()).collect();
        if failures.is_empty() {
            info!(parallel = %self.name, "all children succeeded");
            return Outcome::success(started_at, Utc::now());
        }

        warn!(parallel = %self.name, failed = failures.len(), "parallel node failed");
        let mut errors: Vec<EngineError> = outcomes
            .into_iter()
            .filter(|o| o.is_failure())
            .filter_map(|o| o.into_error())
            .collect();
        let primary = errors.remove(0);
        Outcome::failure(started_at, Utc::now(), EngineError::with_suppressed(primary, errors))
    }
}
