//! Ordered steps with reverse-order best-effort compensation
//!

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::EngineError;
use crate::result::Outcome;
use chrono::Utc;
use tracing::{error, info, warn};

/// A single saga step: an `action` to run forward, and an optional
/// `compensation` to run during rollback.
pub struct SagaStep {
    pub name: String,
    pub action: Workflow,
    pub compensation: Option<Workflow>,
}

impl SagaStep {
    pub fn new(name: impl Into<String>, action: Workflow) -> Self {
        Self {
            name: name.into(),
            action,
            compensation: None,
        }
    }

    pub fn with_compensation(mut self, compensation: Workflow) -> Self {
        self.compensation = Some(compensation);
        self
    }
}

/// Executes [`SagaStep`]s in order; on the first action failure, walks
/// completed steps in reverse running compensations best-effort.
pub struct SagaWorkflow {
    pub(crate) name: String,
    steps: Vec<SagaStep>,
}

impl SagaWorkflow {
    pub fn new(name: impl Into<String>, steps: Vec<SagaStep>) -> Workflow {
        Workflow::new(NodeKind::Saga(SagaWorkflow {
            name: name.into(),
            steps,
        }))
    }

    pub(crate) fn steps(&self) -> &[SagaStep] {
        &self.steps
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();
        let mut completed: Vec<&SagaStep> = Vec::new();

        for step in &self.steps {
            let outcome = step.action.execute(ctx, cancel).await;
            if outcome.is_failure() {
                warn!(saga = %self.name, step = %step.name, "saga step failed, compensating");
                let trigger_error = outcome.into_error().unwrap_or(EngineError::Cancelled {
                    unit: step.name.clone(),
                });

                let mut compensation_errors = Vec::new();
                for completed_step in completed.into_iter().rev() {
                    if let Some(compensation) = &completed_step.compensation {
                        let comp_outcome = compensation.execute(ctx, cancel).await;
                        if comp_outcome.is_failure() {
                            error!(
                                saga = %self.name,
                                step = %completed_step.name,
                                "compensation failed, continuing best-effort"
                            );
                            if let Some(err) = comp_outcome.into_error() {
                                compensation_errors.push(err);
                            }
                        }
                    }
                }

                return Outcome::failure(
                    started_at,
                    Utc::now(),
                    EngineError::with_suppressed(trigger_error, compensation_errors),
                );
            }
            completed.push(step);
        }

        info!(saga = %self.name, "saga completed");
        Outcome::success(started_at, Utc::now())
    }
}
