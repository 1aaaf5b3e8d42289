//! The composable execution tree.
//!
//! Rather than a class hierarchy, `Workflow` is an explicit discriminated
//! variant (`NodeKind`) and execution is a `match` over it. Each arm's
//! future is boxed at the `Workflow::execute` boundary so the mutually
//! recursive call graph (a `Sequence` node's children are themselves
//! `Workflow`s) has a statically known size.

pub mod conditional;
pub mod fallback;
pub mod foreach;
pub mod javascript;
pub mod parallel;
pub mod rate_limited;
pub mod repeat;
pub mod saga;
pub mod sequence;
pub mod switch;
pub mod task_workflow;
pub mod timeout_workflow;

pub use conditional::ConditionalWorkflow;
pub use fallback::FallbackWorkflow;
pub use foreach::ForEachWorkflow;
pub use javascript::{JavascriptWorkflow, NoopScriptEngine, ScriptEngine, ScriptProvider};
pub use parallel::ParallelWorkflow;
pub use rate_limited::RateLimitedWorkflow;
pub use repeat::RepeatWorkflow;
pub use saga::{SagaStep, SagaWorkflow};
pub use sequence::SequentialWorkflow;
pub use switch::DynamicBranchingWorkflow;
pub use task_workflow::TaskWorkflow;
pub use timeout_workflow::TimeoutWorkflow;

use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::result::Outcome;
use futures::future::BoxFuture;
use std::sync::Arc;

/// A tag identifying a [`Workflow`] variant, used by [`crate::render`] to
/// print the container-type label in a rendered tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    Task,
    Sequence,
    Parallel,
    Conditional,
    Switch,
    ForEach,
    Repeat,
    Fallback,
    RateLimited,
    Timeout,
    Saga,
    Javascript,
}

impl NodeTag {
    /// The `<ContainerType>` string rendered verbatim in a tree line.
    pub fn label(&self) -> &'static str {
        match self {
            NodeTag::Task => "Task",
            NodeTag::Sequence => "Sequence",
            NodeTag::Parallel => "Parallel",
            NodeTag::Conditional => "Conditional",
            NodeTag::Switch => "Switch",
            NodeTag::ForEach => "ForEach",
            NodeTag::Repeat => "Repeat",
            NodeTag::Fallback => "Fallback",
            NodeTag::RateLimited => "Rate-Limited",
            NodeTag::Timeout => "Timeout",
            NodeTag::Saga => "Saga",
            NodeTag::Javascript => "JavaScript",
        }
    }
}

pub(crate) enum NodeKind {
    Task(TaskWorkflow),
    Sequence(SequentialWorkflow),
    Parallel(ParallelWorkflow),
    Conditional(ConditionalWorkflow),
    Switch(DynamicBranchingWorkflow),
    ForEach(ForEachWorkflow),
    Repeat(RepeatWorkflow),
    Fallback(FallbackWorkflow),
    RateLimited(RateLimitedWorkflow),
    Timeout(TimeoutWorkflow),
    Saga(SagaWorkflow),
    Javascript(JavascriptWorkflow),
}

/// A node in the composable execution tree.
///
/// Cheap to clone (an `Arc` around the variant), so the same subtree can be
/// referenced from multiple parents — used by the declarative assembly
/// module when a `WorkflowRef` is injected into more than one call site.
#[derive(Clone)]
pub struct Workflow(pub(crate) Arc<NodeKind>);

impl Workflow {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Workflow(Arc::new(kind))
    }

    /// The node's name.
    pub fn name(&self) -> &str {
        match &*self.0 {
            NodeKind::Task(n) => &n.name,
            NodeKind::Sequence(n) => &n.name,
            NodeKind::Parallel(n) => &n.name,
            NodeKind::Conditional(n) => &n.name,
            NodeKind::Switch(n) => &n.name,
            NodeKind::ForEach(n) => &n.name,
            NodeKind::Repeat(n) => &n.name,
            NodeKind::Fallback(n) => &n.name,
            NodeKind::RateLimited(n) => &n.name,
            NodeKind::Timeout(n) => &n.name,
            NodeKind::Saga(n) => &n.name,
            NodeKind::Javascript(n) => &n.name,
        }
    }

    /// The structural tag used by the tree renderer.
    pub fn tag(&self) -> NodeTag {
        match &*self.0 {
            NodeKind::Task(_) => NodeTag::Task,
            NodeKind::Sequence(_) => NodeTag::Sequence,
            NodeKind::Parallel(_) => NodeTag::Parallel,
            NodeKind::Conditional(_) => NodeTag::Conditional,
            NodeKind::Switch(_) => NodeTag::Switch,
            NodeKind::ForEach(_) => NodeTag::ForEach,
            NodeKind::Repeat(_) => NodeTag::Repeat,
            NodeKind::Fallback(_) => NodeTag::Fallback,
            NodeKind::RateLimited(_) => NodeTag::RateLimited,
            NodeKind::Timeout(_) => NodeTag::Timeout,
            NodeKind::Saga(_) => NodeTag::Saga,
            NodeKind::Javascript(_) => NodeTag::Javascript,
        }
    }

    pub(crate) fn kind(&self) -> &NodeKind {
        &self.0
    }

    /// The universal entry point: executes this node against `ctx`,
    /// producing an [`Outcome`].
    ///
    /// Boxed so the tree's mutual recursion (a container's children are
    /// themselves `Workflow`s whose `execute` reaches back here) has a
    /// finite future size regardless of tree depth.
    pub fn execute<'a>(
        &'a self,
        ctx: &'a Context,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                let now = chrono::Utc::now();
                return Outcome::failure(
                    now,
                    now,
                    crate::error::EngineError::Cancelled {
                        unit: self.name().to_string(),
                    },
                );
            }
            match &*self.0 {
                NodeKind::Task(n) => n.run(ctx, cancel).await,
                NodeKind::Sequence(n) => n.run(ctx, cancel).await,
                NodeKind::Parallel(n) => n.run(ctx, cancel).await,
                NodeKind::Conditional(n) => n.run(ctx, cancel).await,
                NodeKind::Switch(n) => n.run(ctx, cancel).await,
                NodeKind::ForEach(n) => n.run(ctx, cancel).await,
                NodeKind::Repeat(n) => n.run(ctx, cancel).await,
                NodeKind::Fallback(n) => n.run(ctx, cancel).await,
                NodeKind::RateLimited(n) => n.run(ctx, cancel).await,
                NodeKind::Timeout(n) => n.run(ctx, cancel).await,
                NodeKind::Saga(n) => n.run(ctx, cancel).await,
                NodeKind::Javascript(n) => n.run(ctx, cancel).await,
            }
        })
    }

    /// Produces a deterministic multi-line rendering of the tree.
    pub fn to_tree_string(&self) -> String {
        crate::render::render(self)
    }
}
