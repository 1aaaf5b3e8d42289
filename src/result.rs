//! The uniform outcome record produced by every workflow node.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// The terminal or in-flight state of a workflow node's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Completed successfully.
    Success,
    /// Completed with an error.
    Failed,
    /// Intentionally skipped; aggregators treat this as success.
    Skipped,
    /// Exceeded its timeout budget.
    TimedOut,
    /// Cancelled before completion.
    Cancelled,
}

impl Status {
    /// `true` iff this status is `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    /// `true` iff this status is `Failed`, `TimedOut`, or `Cancelled`.
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed | Status::TimedOut | Status::Cancelled)
    }

    /// `true` for `Success` or `Skipped` — the two statuses a sequential
    /// aggregator treats as "proceed to the next sibling".
    pub fn allows_continuation(&self) -> bool {
        matches!(self, Status::Success | Status::Skipped)
    }
}

/// A type-erased optional payload produced by a workflow node.
pub type Output = Arc<dyn Any + Send + Sync>;

/// The immutable outcome of executing a workflow node.
///
/// Constructed exclusively through [`Outcome::success`] and
/// [`Outcome::failure`] (plus the narrower helpers built on them) so that
/// `status` and `error` can never drift out of sync.
#[derive(Clone)]
pub struct Outcome {
    status: Status,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    error: Option<EngineError>,
    output: Option<Output>,
}

impl Outcome {
    /// Builds a `Success` outcome (or `Skipped`, via [`Outcome::skipped`]).
    pub fn success(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        Self {
            status: Status::Success,
            started_at,
            completed_at,
            error: None,
            output: None,
        }
    }

    /// Builds a `Skipped` outcome — an intentional no-op, treated as
    /// success by aggregators.
    pub fn skipped(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        Self {
            status: Status::Skipped,
            started_at,
            completed_at,
            error: None,
            output: None,
        }
    }

    /// Builds a failing outcome, classifying the status from `error`:
    /// `TimedOut` / `Cancelled` / `Failed`.
    pub fn failure(started_at: DateTime<Utc>, completed_at: DateTime<Utc>, error: EngineError) -> Self {
        let status = if error.is_timeout() {
            Status::TimedOut
        } else if error.is_cancelled() {
            Status::Cancelled
        } else {
            Status::Failed
        };
        Self {
            status,
            started_at,
            completed_at,
            error: Some(error),
            output: None,
        }
    }

    /// Attaches a type-erased output payload to this outcome.
    pub fn with_output<T>(mut self, output: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.output = Some(Arc::new(output));
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    /// Consumes the outcome, returning its error if any.
    pub fn into_error(self) -> Option<EngineError> {
        self.error
    }

    pub fn output(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.output.as_deref()
    }

    pub fn output_typed<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.output.as_ref().and_then(|o| o.downcast_ref::<T>())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Wall-clock duration of the execution, in seconds with millisecond
    /// precision.
    pub fn execution_duration_secs(&self) -> f64 {
        let millis = (self.completed_at - self.started_at).num_milliseconds().max(0);
        millis as f64 / 1000.0
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outcome")
            .field("status", &self.status)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .field("error", &self.error)
            .field("has_output", &self.output.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_at_never_precedes_started_at() {
        let start = Utc::now();
        let end = start + chrono::Duration::milliseconds(5);
        let outcome = Outcome::success(start, end);
        assert!(outcome.completed_at() >= outcome.started_at());
    }

    #[test]
    fn failure_outcome_always_carries_an_error() {
        let start = Utc::now();
        let end = start;
        let outcome = Outcome::failure(
            start,
            end,
            EngineError::Timeout {
                unit: "x".into(),
                limit_ms: 10,
            },
        );
        assert!(outcome.is_failure());
        assert!(outcome.error().is_some());
        assert_eq!(outcome.status(), Status::TimedOut);
    }

    #[test]
    fn skipped_is_not_a_failure() {
        let now = Utc::now();
        let outcome = Outcome::skipped(now, now);
        assert!(!outcome.is_failure());
        assert!(outcome.status().allows_continuation());
    }

    #[test]
    fn cancelled_error_classifies_as_cancelled_status() {
        let now = Utc::now();
        let outcome = Outcome::failure(
            now,
            now,
            EngineError::Cancelled { unit: "x".into() },
        );
        assert_eq!(outcome.status(), Status::Cancelled);
    }
}
