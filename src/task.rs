//! The atomic unit of work wrapped by [`crate::workflow::TaskWorkflow`].

use crate::context::Context;
use crate::error::TaskError;
use crate::retry::RetryPolicy;
use crate::timeout::TimeoutPolicy;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A functional unit of work that mutates a [`Context`] and/or signals
/// failure via [`TaskError`]
#[async_trait]
pub trait Task: Send + Sync {
    /// Executes the task against `ctx`, mutating it in place.
    async fn execute(&self, ctx: &Context) -> Result<(), TaskError>;

    /// A stable, human-readable identifier. Defaults to a name derived
    /// from a process-unique counter when a task doesn't override it.
    fn name(&self) -> String {
        default_task_name()
    }
}

static TASK_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn default_task_name() -> String {
    let id = TASK_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("task#{id}")
}

/// A closure-backed [`Task`], for composing tasks without a dedicated type.
pub struct FnTask<F> {
    name: String,
    f: F,
}

impl<F> FnTask<F>
where
    F: Fn(&Context) -> Result<(), TaskError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

#[async_trait]
impl<F> Task for FnTask<F>
where
    F: Fn(&Context) -> Result<(), TaskError> + Send + Sync,
{
    async fn execute(&self, ctx: &Context) -> Result<(), TaskError> {
        (self.f)(ctx)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Binds a [`Task`] with its name, retry policy, and timeout policy.
///
/// Builders use a `TaskDescriptor` to produce a
/// [`crate::workflow::TaskWorkflow`]
pub struct TaskDescriptor {
    pub name: String,
    pub task: std::sync::Arc<dyn Task>,
    pub retry_policy: RetryPolicy,
    pub timeout_policy: TimeoutPolicy,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>, task: std::sync::Arc<dyn Task>) -> Self {
        Self {
            name: name.into(),
            task,
            retry_policy: RetryPolicy::none(),
            timeout_policy: TimeoutPolicy::none(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_task_mutates_context_and_reports_name() {
        let task = FnTask::new("writer", |ctx: &Context| {
            ctx.put("written", true);
            Ok(())
        });
        let ctx = Context::new();
        task.execute(&ctx).await.unwrap();
        assert_eq!(ctx.get_typed::<bool>("written"), Some(true));
        assert_eq!(task.name(), "writer");
    }

    #[test]
    fn default_task_names_are_distinct() {
        struct Unnamed;
        #[async_trait]
        impl Task for Unnamed {
            async fn execute(&self, _ctx: &Context) -> Result<(), TaskError> {
                Ok(())
            }
        }
        let a = Unnamed.name();
        let b = Unnamed.name();
        assert_ne!(a, b);
    }
}
