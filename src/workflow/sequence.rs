//! Ordered children executed one after another, short-circuiting on
//! failure

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::result::Outcome;
use chrono::Utc;
use tracing::{info, warn};

/// Runs its children in order, stopping at the first child whose status
/// does not [`crate::result::Status::allows_continuation`].
pub struct SequentialWorkflow {
    pub(crate) name: String,
    children: Vec<Workflow>,
}

impl SequentialWorkflow {
    pub fn new(name: impl Into<String>, children: Vec<Workflow>) -> Workflow {
        Workflow::new(NodeKind::Sequence(SequentialWorkflow {
            name: name.into(),
            children,
        }))
    }

    pub(crate) fn children(&self) -> &[Workflow] {
        &self.children
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();

        if self.children.is_empty() {
            return Outcome::success(started_at, Utc::now());
        }

        for child in &self.children {
            let outcome = child.execute(ctx, cancel).await;
            if !outcome.status().allows_continuation() {
                warn!(
                    sequence = %self.name,
                    failed_child = child.name(),
                    "sequence short-circuited"
                );
                let error = outcome
                    .into_error()
                    .unwrap_or(crate::error::EngineError::Cancelled {
                        unit: child.name().to_string(),
                    });
                return Outcome::failure(started_at, Utc::now(), error);
            }
        }

        info!(sequence = %self.name, "sequence completed");
        Outcome::success(started_at, Utc::now())
    }
}
