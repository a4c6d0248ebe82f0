//! Cooperative cancellation for pipeline generations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A cancellation token owned by one pipeline generation.
///
/// `cancel` is synchronous: by the time it returns, every subsequent
/// `is_cancelled` observes true. That is what lets a parameter change
/// supersede the previous generation before starting the next one, without
/// awaiting anything. Cancellation is advisory to in-flight transport calls
/// (they are raced against [`CancelToken::cancelled`]) and mandatory at
/// state-write and reducer boundaries (checked via
/// [`CancelToken::is_cancelled`]).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation and wakes anything waiting in
    /// [`CancelToken::cancelled`].
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled. Never resolves for a token
    /// that is never cancelled.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            // The flag may have flipped between the check and registering
            // the waiter.
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
