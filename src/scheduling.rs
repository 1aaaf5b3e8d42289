//! The injected scheduling handle `ParallelWorkflow` and `TimeoutWorkflow`
//! fan work out onto.
//!
//! Rather than baking `tokio::spawn` directly into every concurrent node,
//! scheduling goes through a small injectable trait so the same
//! composition logic could run over native threads or another executor.
//! The default, `TokioScheduler`, is what every node uses unless a caller
//! supplies their own.
//!
//! `Scheduler::submit` is specialised to `Outcome` rather than generic
//! over the spawned future's output: a `dyn Scheduler` trait object needs
//! a fixed vtable, and every call site in this crate schedules a
//! `Workflow::execute` future, whose output is always an `Outcome`.

use crate::result::Outcome;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;

/// A future-like handle to spawned work, with the ability to request
/// cancellation.
pub struct JoinTask {
    handle: JoinHandle<Outcome>,
}

impl JoinTask {
    /// Requests that the underlying task be aborted. A best-effort signal:
    /// the task only actually stops at its next `.await` point.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub async fn join(self) -> Result<Outcome, tokio::task::JoinError> {
        self.handle.await
    }
}

/// Scheduling handle injected into concurrent nodes.
pub trait Scheduler: Send + Sync {
    /// Spawns `fut` onto the scheduler, returning a handle that can be
    /// awaited or aborted.
    fn submit(&self, fut: BoxFuture<'static, Outcome>) -> JoinTask;
}

/// The default scheduler: runs work on the ambient Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn submit(&self, fut: BoxFuture<'static, Outcome>) -> JoinTask {
        JoinTask {
            handle: tokio::spawn(fut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn tokio_scheduler_runs_and_joins() {
        let scheduler = TokioScheduler;
        let handle = scheduler.submit(Box::pin(async {
            let now = Utc::now();
            Outcome::success(now, now)
        }));
        assert!(handle.join().await.unwrap().is_success());
    }

    #[tokio::test]
    async fn abort_stops_a_sleeping_task() {
        let scheduler = TokioScheduler;
        let handle = scheduler.submit(Box::pin(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            let now = Utc::now();
            Outcome::success(now, now)
        }));
        handle.abort();
        let result = handle.join().await;
        assert!(result.is_err());
    }
}
