//! Gates child execution through a [`RateLimiter`]

use super::{NodeKind, Workflow};
use crate::cancellation::CancellationToken;
use crate::context::Context;
use crate::error::EngineError;
use crate::rate_limiter::RateLimiter;
use crate::result::Outcome;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// How admission denial is handled when the node doesn't block for a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdmissionMode {
    /// Waits for a permit to become available (the default).
    Blocking,
    /// `try_acquire`; a denial is reported rather than fails the node.
    NonBlocking { strict: bool },
}

/// Acquires a permit from `strategy` before executing `child`. Under the
/// default blocking mode this waits for admission; in a non-blocking mode a
/// denied `try_acquire` either skips the node (non-strict) or fails it
/// (`strict`) instead of blocking.
pub struct RateLimitedWorkflow {
    pub(crate) name: String,
    child: Workflow,
    strategy: Arc<dyn RateLimiter>,
    mode: AdmissionMode,
}

impl RateLimitedWorkflow {
    /// Blocking-acquire mode (the default).
    pub fn new(name: impl Into<String>, child: Workflow, strategy: Arc<dyn RateLimiter>) -> Workflow {
        Workflow::new(NodeKind::RateLimited(RateLimitedWorkflow {
            name: name.into(),
            child,
            strategy,
            mode: AdmissionMode::Blocking,
        }))
    }

    /// Non-blocking, non-strict mode: a denied `try_acquire` skips the node
    /// (`Status::Skipped`) rather than blocking for admission.
    pub fn skip_when_denied(
        name: impl Into<String>,
        child: Workflow,
        strategy: Arc<dyn RateLimiter>,
    ) -> Workflow {
        Workflow::new(NodeKind::RateLimited(RateLimitedWorkflow {
            name: name.into(),
            child,
            strategy,
            mode: AdmissionMode::NonBlocking { strict: false },
        }))
    }

    /// Strict mode: a denied `try_acquire` fails the node rather than
    /// blocking for admission.
    pub fn strict(name: impl Into<String>, child: Workflow, strategy: Arc<dyn RateLimiter>) -> Workflow {
        Workflow::new(NodeKind::RateLimited(RateLimitedWorkflow {
            name: name.into(),
            child,
            strategy,
            mode: AdmissionMode::NonBlocking { strict: true },
        }))
    }

    pub(crate) fn child(&self) -> &Workflow {
        &self.child
    }

    pub(super) async fn run(&self, ctx: &Context, cancel: &CancellationToken) -> Outcome {
        let started_at = Utc::now();

        match self.mode {
            AdmissionMode::Blocking => {
                self.strategy.acquire().await;
            }
            AdmissionMode::NonBlocking { strict: true } => {
                if !self.strategy.try_acquire() {
                    debug!(rate_limited = %self.name, "admission denied in strict mode");
                    return Outcome::failure(
                        started_at,
                        Utc::now(),
                        EngineError::RateLimitExceeded { unit: self.name.clone() },
                    );
                }
            }
            AdmissionMode::NonBlocking { strict: false } => {
                if !self.strategy.try_acquire() {
                    debug!(rate_limited = %self.name, "admission denied, skipping node");
                    return Outcome::skipped(started_at, Utc::now());
                }
            }
        }

        let outcome = self.child.execute(ctx, cancel).await;
        self.strategy.release();
        outcome
    }
}
