//! Error taxonomy for the workflow composition and execution engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Classifies a [`TaskError`] so policy code can decide retry eligibility
/// without matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskErrorKind {
    /// A task's required input was missing or malformed.
    Validation,
    /// A task failed during its normal execution path.
    Execution,
}

/// The error type tasks raise from inside [`crate::task::Task::execute`].
///
/// Execution vs. validation failures are modeled as a `kind` discriminant
/// rather than a type hierarchy.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl TaskError {
    /// Builds a generic execution failure. Retryable by default.
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::Execution,
            message: message.into(),
            retryable: true,
        }
    }

    /// Builds a validation failure. Not retryable by default: a missing
    /// required input will not start existing on a retry.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::Validation,
            message: message.into(),
            retryable: false,
        }
    }

    /// Overrides the default retry eligibility for this error instance.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Main error type for the workflow engine.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// A task raised an error during execution.
    #[error("task '{task}' execution failed: {source}")]
    TaskExecutionFailed { task: String, source: TaskError },

    /// A task reported missing/invalid required input.
    #[error("task '{task}' validation failed: {source}")]
    TaskValidationFailed { task: String, source: TaskError },

    /// A unit exceeded its timeout budget.
    #[error("'{unit}' timed out after {limit_ms}ms")]
    Timeout { unit: String, limit_ms: u64 },

    /// A unit was cancelled before completion.
    #[error("'{unit}' was cancelled")]
    Cancelled { unit: String },

    /// Retry attempts were exhausted without success.
    #[error("retries exhausted for '{unit}' after {attempts} attempt(s): {last_error}")]
    RetryExhausted {
        unit: String,
        attempts: u32,
        last_error: Box<EngineError>,
    },

    /// An aggregation node (parallel, saga, ...) failed with a primary
    /// cause and zero or more suppressed causes from sibling failures.
    #[error("{primary} (+{} suppressed)", suppressed.len())]
    Aggregate {
        primary: Box<EngineError>,
        suppressed: Vec<EngineError>,
    },

    /// Declarative assembly could not construct a node: instantiation,
    /// invocation, or type-mismatch failures.
    #[error("workflow build failed: {0}")]
    WorkflowBuild(String),

    /// Declarative assembly could not resolve a reference: missing marker,
    /// instantiation failure of the referenced definition.
    #[error("workflow composition failed: {0}")]
    WorkflowComposition(String),

    /// A cycle was detected while walking reference edges during
    /// declarative assembly. Subtype of [`EngineError::WorkflowComposition`].
    #[error("circular workflow composition detected: {0}")]
    CircularComposition(String),

    /// A required builder field was missing at construction time.
    #[error("cannot build '{node}': {reason}")]
    InvalidDefinition { node: String, reason: String },

    /// Rate limiter denied admission in strict mode.
    #[error("rate limit exceeded for '{unit}'")]
    RateLimitExceeded { unit: String },
}

impl EngineError {
    /// True when the failure is eligible for retry under a policy that
    /// retries non-fatal kinds.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::TaskExecutionFailed { source, .. } => source.retryable,
            EngineError::TaskValidationFailed { source, .. } => source.retryable,
            EngineError::Timeout { .. } => true,
            EngineError::Cancelled { .. } => false,
            EngineError::RetryExhausted { .. } => false,
            EngineError::Aggregate { primary, .. } => primary.is_retryable(),
            EngineError::WorkflowBuild(_)
            | EngineError::WorkflowComposition(_)
            | EngineError::CircularComposition(_)
            | EngineError::InvalidDefinition { .. } => false,
            EngineError::RateLimitExceeded { .. } => false,
        }
    }

    /// Attaches sibling failures as suppressed causes on a primary error,
    /// used by aggregation nodes (Parallel, Saga).
    pub fn with_suppressed(primary: EngineError, suppressed: Vec<EngineError>) -> EngineError {
        if suppressed.is_empty() {
            primary
        } else {
            EngineError::Aggregate {
                primary: Box::new(primary),
                suppressed,
            }
        }
    }

    /// Returns true if this error (or its primary cause) originated from a
    /// timeout, used to classify aggregate status as `TIMED_OUT`.
    pub fn is_timeout(&self) -> bool {
        match self {
            EngineError::Timeout { .. } => true,
            EngineError::Aggregate { primary, .. } => primary.is_timeout(),
            EngineError::RetryExhausted { last_error, .. } => last_error.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if this error (or its primary cause) originated from
    /// cancellation, used to classify aggregate status as `CANCELLED`.
    pub fn is_cancelled(&self) -> bool {
        match self {
            EngineError::Cancelled { .. } => true,
            EngineError::Aggregate { primary, .. } => primary.is_cancelled(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::WorkflowBuild(err.to_string())
    }
}
