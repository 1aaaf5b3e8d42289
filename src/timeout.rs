//! Bounds the wall-clock duration of a single execution attempt.

use std::time::Duration;

/// Bounds the wall-clock duration of a single execution attempt.
/// `TimeoutPolicy::none()` applies no bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    limit: Option<Duration>,
}

impl TimeoutPolicy {
    pub fn none() -> Self {
        Self { limit: None }
    }

    pub fn of_millis(millis: u64) -> Self {
        Self {
            limit: Some(Duration::from_millis(millis)),
        }
    }

    pub fn of_seconds(secs: u64) -> Self {
        Self {
            limit: Some(Duration::from_secs(secs)),
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn is_bounded(&self) -> bool {
        self.limit.is_some()
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy::none()
    }
}
