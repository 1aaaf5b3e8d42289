//! Executes a body a fixed number of times

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::EngineError;
use crate::result::Outcome;
use chrono::Utc;
use tracing::warn;

const DEFAULT_INDEX_VARIABLE: &str = "repeat.index";

/// Executes `body` `times` times, writing the current iteration index to
/// `Context[index_variable]` before each execution. Short-circuits on
/// failure.
pub struct RepeatWorkflow {
    pub(crate) name: String,
    times: u32,
    index_variable: String,
    body: Workflow,
}

impl RepeatWorkflow {
    pub fn new(name: impl Into<String>, times: u32, body: Workflow) -> Workflow {
        Self::with_index_variable(name, times, DEFAULT_INDEX_VARIABLE, body)
    }

    pub fn with_index_variable(
        name: impl Into<String>,
        times: u32,
        index_variable: impl Into<String>,
        body: Workflow,
    ) -> Workflow {
        Workflow::new(NodeKind::Repeat(RepeatWorkflow {
            name: name.into(),
            times,
            index_variable: index_variable.into(),
            body,
        }))
    }

    pub(crate) fn times(&self) -> u32 {
        self.times
    }

    pub(crate) fn index_variable(&self) -> &str {
        &self.index_variable
    }

    pub(crate) fn body(&self) -> &Workflow {
        &self.body
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();

        for index in 0..self.times {
            ctx.put(self.index_variable.clone(), index);
            let outcome = self.body.execute(ctx, cancel).await;
            if !outcome.status().allows_continuation() {
                warn!(repeat = %self.name, index, "repeat short-circuited");
                let error = outcome.into_error().unwrap_or(EngineError::Cancelled {
                    unit: self.name.clone(),
                });
                return Outcome::failure(started_at, Utc::now(), error);
            }
        }

        Outcome::success(started_at, Utc::now())
    }
}
