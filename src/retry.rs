//! Retry policies with constant, linear, and exponential backoff.

use crate::error::EngineError;
use std::collections::HashSet;
use std::time::Duration;

use crate::error::TaskErrorKind;

/// Computes the delay before the next attempt, as a pure function of the
/// attempt number.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// No delay between attempts.
    Constant { delay_ms: u64 },
    /// Delay grows linearly with the attempt number.
    Linear { initial_delay_ms: u64, increment_ms: u64, max_delay_ms: u64 },
    /// Delay doubles (or scales by `multiplier`) each attempt, capped.
    Exponential {
        initial_delay_ms: u64,
        multiplier: f64,
        max_delay_ms: u64,
    },
}

impl BackoffStrategy {
    pub fn constant(delay_ms: u64) -> Self {
        BackoffStrategy::Constant { delay_ms }
    }

    pub fn linear(initial_delay_ms: u64, increment_ms: u64, max_delay_ms: u64) -> Self {
        BackoffStrategy::Linear {
            initial_delay_ms,
            increment_ms,
            max_delay_ms,
        }
    }

    pub fn exponential(initial_delay_ms: u64, multiplier: f64, max_delay_ms: u64) -> Self {
        BackoffStrategy::Exponential {
            initial_delay_ms,
            multiplier,
            max_delay_ms,
        }
    }

    /// Computes the delay before attempt `attempt_number + 1`.
    /// Attempt numbers are 1-based: the first failure is attempt 1, and
    /// this delay is what elapses before attempt 2.
    pub fn compute_delay_ms(&self, attempt_number: u32) -> u64 {
        match self {
            BackoffStrategy::Constant { delay_ms } => *delay_ms,
            BackoffStrategy::Linear {
                initial_delay_ms,
                increment_ms,
                max_delay_ms,
            } => {
                let delay = initial_delay_ms + increment_ms * (attempt_number.saturating_sub(1) as u64);
                delay.min(*max_delay_ms)
            }
            BackoffStrategy::Exponential {
                initial_delay_ms,
                multiplier,
                max_delay_ms,
            } => {
                let raw = (*initial_delay_ms as f64)
                    * multiplier.powi(attempt_number.saturating_sub(1) as i32);
                (raw.min(*max_delay_ms as f64)) as u64
            }
        }
    }
}

/// Optional jitter applied on top of a [`BackoffStrategy`]'s computed
/// delay. Seeded from an injected source so tests stay deterministic.
pub trait JitterSource: Send + Sync {
    /// Returns a value in `[0.0, 1.0)`.
    fn next(&self) -> f64;
}

/// The default jitter source, backed by `rand`.
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn next(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Decides retry eligibility and yields per-attempt backoff delay.
#[derive(Clone)]
pub struct RetryPolicy {
    max_additional_attempts: u32,
    retryable_kinds: Option<HashSet<TaskErrorKind>>,
    backoff: Option<std::sync::Arc<BackoffStrategy>>,
    jitter_fraction: f64,
    jitter_source: Option<std::sync::Arc<dyn JitterSource>>,
}

impl RetryPolicy {
    /// Never retries.
    pub fn none() -> Self {
        Self {
            max_additional_attempts: 0,
            retryable_kinds: None,
            backoff: None,
            jitter_fraction: 0.0,
            jitter_source: None,
        }
    }

    /// Retries up to `max` additional attempts on any failure.
    pub fn limited_retries(max: u32) -> Self {
        Self {
            max_additional_attempts: max,
            retryable_kinds: None,
            backoff: Some(std::sync::Arc::new(BackoffStrategy::constant(0))),
            jitter_fraction: 0.0,
            jitter_source: None,
        }
    }

    /// Retries up to `max` additional attempts, but only when the last
    /// error's task kind is in `kinds`.
    pub fn limited_retries_on(max: u32, kinds: impl IntoIterator<Item = TaskErrorKind>) -> Self {
        Self {
            max_additional_attempts: max,
            retryable_kinds: Some(kinds.into_iter().collect()),
            backoff: Some(std::sync::Arc::new(BackoffStrategy::constant(0))),
            jitter_fraction: 0.0,
            jitter_source: None,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = Some(std::sync::Arc::new(backoff));
        self
    }

    /// Adds jitter: each computed delay is increased by up to
    /// `fraction * delay` (e.g. `0.5` for up to 50% extra).
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self.jitter_source = Some(std::sync::Arc::new(RandomJitter));
        self
    }

    /// Overrides the jitter source, for deterministic tests.
    pub fn with_jitter_source(mut self, fraction: f64, source: std::sync::Arc<dyn JitterSource>) -> Self {
        self.jitter_fraction = fraction;
        self.jitter_source = Some(source);
        self
    }

    /// Attempt numbers are 1-based: the first failure is attempt 1.
    pub fn should_retry(&self, attempt_number: u32, last_error: &EngineError) -> bool {
        if attempt_number > self.max_additional_attempts {
            return false;
        }
        if let Some(kinds) = &self.retryable_kinds {
            let matches = match last_error {
                EngineError::TaskExecutionFailed { source, .. } => kinds.contains(&source.kind),
                EngineError::TaskValidationFailed { source, .. } => kinds.contains(&source.kind),
                _ => false,
            };
            if !matches {
                return false;
            }
        }
        true
    }

    /// Computes the delay before the next attempt, including jitter.
    pub fn compute_delay_ms(&self, attempt_number: u32) -> u64 {
        let Some(backoff) = &self.backoff else {
            return 0;
        };
        let base = backoff.compute_delay_ms(attempt_number);
        if self.jitter_fraction <= 0.0 {
            return base;
        }
        let Some(source) = &self.jitter_source else {
            return base;
        };
        let extra = (base as f64 * self.jitter_fraction * source.next()) as u64;
        base.saturating_add(extra)
    }

    pub fn compute_delay(&self, attempt_number: u32) -> Duration {
        Duration::from_millis(self.compute_delay_ms(attempt_number))
    }

    pub fn max_additional_attempts(&self) -> u32 {
        self.max_additional_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;

    fn exec_error() -> EngineError {
        EngineError::TaskExecutionFailed {
            task: "t".into(),
            source: TaskError::execution("boom"),
        }
    }

    #[test]
    fn none_never_retries() {
        let policy = RetryPolicy::none();
        assert!(!policy.should_retry(1, &exec_error()));
    }

    #[test]
    fn limited_retries_stops_after_max() {
        let policy = RetryPolicy::limited_retries(3);
        assert!(policy.should_retry(1, &exec_error()));
        assert!(policy.should_retry(2, &exec_error()));
        assert!(policy.should_retry(3, &exec_error()));
        assert!(!policy.should_retry(4, &exec_error()));
    }

    #[test]
    fn limited_retries_on_filters_by_kind() {
        let policy = RetryPolicy::limited_retries_on(3, [TaskErrorKind::Validation]);
        // default exec_error is Execution kind, not retryable under this policy
        assert!(!policy.should_retry(1, &exec_error()));

        let validation = EngineError::TaskValidationFailed {
            task: "t".into(),
            source: TaskError::validation("missing"),
        };
        assert!(policy.should_retry(1, &validation));
    }

    #[test]
    fn constant_backoff_is_flat() {
        let backoff = BackoffStrategy::constant(500);
        assert_eq!(backoff.compute_delay_ms(1), 500);
        assert_eq!(backoff.compute_delay_ms(5), 500);
    }

    #[test]
    fn linear_backoff_grows_and_caps() {
        let backoff = BackoffStrategy::linear(100, 50, 300);
        assert_eq!(backoff.compute_delay_ms(1), 100);
        assert_eq!(backoff.compute_delay_ms(2), 150);
        assert_eq!(backoff.compute_delay_ms(5), 300);
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = BackoffStrategy::exponential(100, 2.0, 1000);
        assert_eq!(backoff.compute_delay_ms(1), 100);
        assert_eq!(backoff.compute_delay_ms(2), 200);
        assert_eq!(backoff.compute_delay_ms(3), 400);
        assert_eq!(backoff.compute_delay_ms(4), 800);
        assert_eq!(backoff.compute_delay_ms(5), 1000);
    }

    struct FixedJitter(f64);
    impl JitterSource for FixedJitter {
        fn next(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn jitter_adds_deterministic_extra_from_injected_source() {
        let policy = RetryPolicy::limited_retries(3)
            .with_backoff(BackoffStrategy::constant(100))
            .with_jitter_source(0.5, std::sync::Arc::new(FixedJitter(1.0)));
        // base 100 + (100 * 0.5 * 1.0) = 150
        assert_eq!(policy.compute_delay_ms(1), 150);
    }
}
