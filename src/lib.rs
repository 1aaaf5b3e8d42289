//! # Workflow Composition and Execution Engine
//!
//! A library for composing [`Task`](task::Task)s into [`Workflow`](workflow::Workflow)
//! trees and executing them against a shared [`Context`](context::Context).
//!
//! ## Quick start
//!
//! ```rust
//! use workflow_engine::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let pipeline = SequentialWorkflow::new(
//!     "pipeline",
//!     vec![
//!         TaskWorkflow::new(TaskDescriptor::new(
//!             "extract",
//!             Arc::new(FnTask::new("extract", |ctx: &Context| {
//!                 ctx.put("rows", 42i64);
//!                 Ok(())
//!             })),
//!         )),
//!         TaskWorkflow::new(TaskDescriptor::new(
//!             "report",
//!             Arc::new(FnTask::new("report", |ctx: &Context| {
//!                 let rows = ctx.get_typed::<i64>("rows").unwrap_or(0);
//!                 ctx.put("summary", format!("{rows} rows processed"));
//!                 Ok(())
//!             })),
//!         )),
//!     ],
//! );
//!
//! let ctx = Context::new();
//! let cancel = CancellationToken::new();
//! let outcome = pipeline.execute(&ctx, &cancel).await;
//! assert!(outcome.is_success());
//! assert_eq!(ctx.get_typed::<String>("summary").unwrap(), "42 rows processed");
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`context`] — the type-erased, concurrency-safe keyed store threaded
//!   through execution.
//! - [`result`] — `Status` and `Outcome`, the uniform record every node
//!   produces.
//! - [`task`] — the atomic unit of work, and [`task::TaskDescriptor`]
//!   binding it to retry/timeout policy.
//! - [`workflow`] — the composable execution tree: `TaskWorkflow`,
//!   `SequentialWorkflow`, `ParallelWorkflow`, and the rest of the node
//!   catalogue.
//! - [`retry`], [`timeout`], [`rate_limiter`], [`cancellation`],
//!   [`scheduling`] — the resilience and concurrency primitives nodes are
//!   built from.
//! - [`assembly`] — declarative composition of a `Workflow` tree from a
//!   [`assembly::WorkflowDefinition`].
//! - [`render`] — deterministic tree rendering via
//!   [`workflow::Workflow::to_tree_string`].
//! - [`error`] — the engine's error taxonomy.

pub mod assembly;
pub mod cancellation;
pub mod context;
pub mod error;
pub mod rate_limiter;
pub mod render;
pub mod result;
pub mod retry;
pub mod scheduling;
pub mod task;
pub mod timeout;
pub mod workflow;

pub use cancellation::CancellationToken;
pub use context::Context;
pub use error::{EngineError, EngineResult, TaskError, TaskErrorKind};
pub use rate_limiter::RateLimiter;
pub use result::{Outcome, Status};
pub use retry::{BackoffStrategy, JitterSource, RetryPolicy};
pub use scheduling::{Scheduler, TokioScheduler};
pub use task::{FnTask, Task, TaskDescriptor};
pub use timeout::TimeoutPolicy;
pub use workflow::Workflow;

/// Convenience re-exports for composing a workflow tree.
pub mod prelude {
    pub use crate::assembly::{build, ElementKind, WorkflowDefinition, WorkflowElement, WorkflowRef};
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::Context;
    pub use crate::error::{EngineError, EngineResult, TaskError, TaskErrorKind};
    pub use crate::rate_limiter::{
        FixedWindowLimiter, RateLimiter, SemaphoreLimiter, TokenBucketLimiter, Unlimited,
    };
    pub use crate::result::{Outcome, Status};
    pub use crate::retry::{BackoffStrategy, JitterSource, RetryPolicy};
    pub use crate::scheduling::{Scheduler, TokioScheduler};
    pub use crate::task::{FnTask, Task, TaskDescriptor};
    pub use crate::timeout::TimeoutPolicy;
    pub use crate::workflow::{
        ConditionalWorkflow, DynamicBranchingWorkflow, FallbackWorkflow, ForEachWorkflow,
        JavascriptWorkflow, NoopScriptEngine, ParallelWorkflow, RateLimitedWorkflow, RepeatWorkflow,
        SagaStep, SagaWorkflow, ScriptEngine, ScriptProvider, SequentialWorkflow, TaskWorkflow,
        TimeoutWorkflow, Workflow,
    };
}

/// Current version of the workflow engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn prelude_composes_a_runnable_pipeline() {
        let pipeline = SequentialWorkflow::new(
            "pipeline",
            vec![TaskWorkflow::new(TaskDescriptor::new(
                "step",
                Arc::new(FnTask::new("step", |ctx: &Context| {
                    ctx.put("ran", true);
                    Ok(())
                })),
            ))],
        );
        let ctx = Context::new();
        let cancel = CancellationToken::new();
        let outcome = pipeline.execute(&ctx, &cancel).await;
        assert!(outcome.is_success());
        assert_eq!(ctx.get_typed::<bool>("ran"), Some(true));
    }

    #[test]
    fn version_is_exposed() {
        assert!(!super::VERSION.is_empty());
    }
}
