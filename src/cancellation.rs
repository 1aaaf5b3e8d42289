//! A first-class cancellation signal threaded alongside [`crate::context::Context`].
//!
//! Cancellation is not an exception but an explicit, clonable token any node
//! can observe or trigger. Kept minimal and owned directly rather than
//! pulling in `tokio-util`'s `CancellationToken` — the surface needed here is
//! small (`cancel`, `is_cancelled`, `cancelled().await`), see DESIGN.md.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable, shareable cancellation signal.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; wakes any task awaiting [`CancellationToken::cancelled`].
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancellationToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// A child token independent in storage but convenient for call sites
    /// that want a token scoped to a single sub-execution (e.g. one
    /// `ParallelWorkflow` child) while still observing the parent.
    pub fn child(&self) -> CancellationToken {
        let child = CancellationToken::new();
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }
}
