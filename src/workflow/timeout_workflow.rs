//! Bounds a child's total execution time

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::EngineError;
use crate::result::Outcome;
use crate::scheduling::{Scheduler, TokioScheduler};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Runs `child` on an injected [`Scheduler`], cancelling it and returning
/// `TIMED_OUT` if wall-clock time exceeds `limit`.
pub struct TimeoutWorkflow {
    pub(crate) name: String,
    child: Workflow,
    limit: Duration,
    scheduler: Arc<dyn Scheduler>,
}

impl TimeoutWorkflow {
    pub fn new(name: impl Into<String>, child: Workflow, limit: Duration) -> Workflow {
        Self::with_scheduler(name, child, limit, Arc::new(TokioScheduler))
    }

    pub fn with_scheduler(
        name: impl Into<String>,
        child: Workflow,
        limit: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Workflow {
        Workflow::new(NodeKind::Timeout(TimeoutWorkflow {
            name: name.into(),
            child,
            limit,
            scheduler,
        }))
    }

    pub(crate) fn child(&self) -> &Workflow {
        &self.child
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();
        let child_cancel = cancel.child();
        let child = self.child.clone();
        let child_ctx = ctx.share();
        let worker_cancel = child_cancel.clone();
        let fut: futures::future::BoxFuture<'static, Outcome> =
            Box::pin(async move { child.execute(&child_ctx, &worker_cancel).await });
        let handle = self.scheduler.submit(fut);

        match tokio::time::timeout(self.limit, handle.join()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Outcome::failure(
                started_at,
                Utc::now(),
                EngineError::Cancelled { unit: self.name.clone() },
            ),
            Err(_) => {
                warn!(timeout = %self.name, limit_ms = self.limit.as_millis(), "child exceeded time budget");
                child_cancel.cancel();
                Outcome::failure(
                    started_at,
                    Utc::now(),
                    EngineError::Timeout {
                        unit: self.name.clone(),
                        limit_ms: self.limit.as_millis() as u64,
                    },
                )
            }
        }
    }
}
