//! Iterates a collection read from [`Context`], running a body per
//! element.

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::{EngineError, TaskError};
use crate::result::Outcome;
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use tracing::warn;

/// The iterable collection stored at a ForEach node's `items_key`. Stored
/// as a type-erased `Vec` so callers can iterate any `Clone + 'static`
/// element type.
pub trait IterableItems: Send + Sync {
    fn len(&self) -> usize;
    fn item_at(&self, index: usize) -> Arc<dyn Any + Send + Sync>;
}

impl<T> IterableItems for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn item_at(&self, index: usize) -> Arc<dyn Any + Send + Sync> {
        Arc::new(self[index].clone())
    }
}

/// Reads `Context[items_key]`, writing each element to `Context[item_variable]`
/// before running `body`, short-circuiting on the first failure.
pub struct ForEachWorkflow {
    pub(crate) name: String,
    items_key: String,
    item_variable: String,
    body: Workflow,
}

impl ForEachWorkflow {
    pub fn new(
        name: impl Into<String>,
        items_key: impl Into<String>,
        item_variable: impl Into<String>,
        body: Workflow,
    ) -> Workflow {
        Workflow::new(NodeKind::ForEach(ForEachWorkflow {
            name: name.into(),
            items_key: items_key.into(),
            item_variable: item_variable.into(),
            body,
        }))
    }

    pub(crate) fn items_key(&self) -> &str {
        &self.items_key
    }

    pub(crate) fn item_variable(&self) -> &str {
        &self.item_variable
    }

    pub(crate) fn body(&self) -> &Workflow {
        &self.body
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();

        let items = ctx.with_typed::<Arc<dyn IterableItems>, usize>(&self.items_key, |items| {
            items.len()
        });
        let Some(len) = items else {
            return Outcome::failure(
                started_at,
                Utc::now(),
                EngineError::TaskExecutionFailed {
                    task: self.name.clone(),
                    source: TaskError::validation(format!(
                        "Context['{}'] is absent or not iterable",
                        self.items_key
                    )),
                },
            );
        };

        for index in 0..len {
            let element = ctx
                .with_typed::<Arc<dyn IterableItems>, Arc<dyn Any + Send + Sync>>(
                    &self.items_key,
                    |items| items.item_at(index),
                )
                .expect("validated above");
            ctx.put(self.item_variable.clone(), element);

            let outcome = self.body.execute(ctx, cancel).await;
            if !outcome.status().allows_continuation() {
                warn!(for_each = %self.name, index, "foreach short-circuited");
                let error = outcome.into_error().unwrap_or(EngineError::Cancelled {
                    unit: self.name.clone(),
                });
                return Outcome::failure(started_at, Utc::now(), error);
            }
        }

        Outcome::success(started_at, Utc::now())
    }
}
