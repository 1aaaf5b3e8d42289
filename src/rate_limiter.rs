//! Admission control gating workflow execution rate.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Admission gate: acquire/release/try-acquire semantics.
/// Implementations must be internally thread-safe.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Blocks until a permit is available.
    async fn acquire(&self);

    /// Attempts to acquire a permit without blocking.
    fn try_acquire(&self) -> bool;

    /// Releases a permit previously obtained, for strategies that model
    /// release (semaphore-style). Token-bucket and fixed-window strategies
    /// treat this as a no-op: their tokens replenish on a timer, not on
    /// release.
    fn release(&self) {}
}

/// A semaphore-backed limiter: admits up to `permits` concurrent holders,
/// released when the holder calls [`RateLimiter::release`].
pub struct SemaphoreLimiter {
    semaphore: Arc<Semaphore>,
}

impl SemaphoreLimiter {
    pub fn new(permits: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }
}

#[async_trait]
impl RateLimiter for SemaphoreLimiter {
    async fn acquire(&self) {
        self.semaphore
            .acquire()
            .await
            .expect("semaphore never closed")
            .forget();
    }

    fn try_acquire(&self) -> bool {
        match self.semaphore.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    fn release(&self) {
        self.semaphore.add_permits(1);
    }
}

/// A token-bucket limiter: refills `refill_amount` tokens every
/// `refill_interval`, capped at `capacity`.
pub struct TokenBucketLimiter {
    state: Mutex<TokenBucketState>,
    capacity: f64,
    refill_per_ms: f64,
}

struct TokenBucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucketLimiter {
    pub fn new(capacity: u64, refill_amount: u64, refill_interval: Duration) -> Self {
        let refill_per_ms = refill_amount as f64 / refill_interval.as_millis().max(1) as f64;
        Self {
            state: Mutex::new(TokenBucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
            capacity: capacity as f64,
            refill_per_ms,
        }
    }

    fn refill_locked(&self, state: &mut TokenBucketState) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(state.last_refill).as_millis() as f64;
        if elapsed_ms > 0.0 {
            state.tokens = (state.tokens + elapsed_ms * self.refill_per_ms).min(self.capacity);
            state.last_refill = now;
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        self.refill_locked(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// A fixed-window limiter: admits up to `max_per_window` acquisitions per
/// `window`, resetting the count at window boundaries.
pub struct FixedWindowLimiter {
    state: Mutex<FixedWindowState>,
    max_per_window: usize,
    window: Duration,
}

struct FixedWindowState {
    window_start: Instant,
    count: usize,
}

impl FixedWindowLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            state: Mutex::new(FixedWindowState {
                window_start: Instant::now(),
                count: 0,
            }),
            max_per_window,
            window,
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.count = 0;
        }
        if state.count < self.max_per_window {
            state.count += 1;
            true
        } else {
            false
        }
    }
}

/// An unbounded limiter that never denies admission, used as the default
/// for nodes that do not configure a strategy.
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}
    fn try_acquire(&self) -> bool {
        true
    }
}

/// A limiter useful in tests: denies or admits deterministically based on
/// a queue of pre-scripted answers, falling back to `default_admit`.
#[derive(Default)]
pub struct ScriptedLimiter {
    answers: Mutex<VecDeque<bool>>,
    default_admit: bool,
}

impl ScriptedLimiter {
    pub fn new(answers: impl IntoIterator<Item = bool>, default_admit: bool) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            default_admit,
        }
    }
}

#[async_trait]
impl RateLimiter for ScriptedLimiter {
    async fn acquire(&self) {}

    fn try_acquire(&self) -> bool {
        self.answers.lock().pop_front().unwrap_or(self.default_admit)
    }
}
