//! Cooperative cancellation shared by a context and its children.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// A callback run once when the token is cancelled.
pub type CancelCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Pending {
    reason: Option<String>,
    callbacks: Vec<CancelCallback>,
}

/// Cancellation flag for one run.
///
/// Steps never check it themselves; wrapped functions decide whether and when
/// to observe it. The first reason given is the one kept.
#[derive(Default)]
pub struct CancellationToken {
    flag: AtomicBool,
    pending: Mutex<Pending>,
    waiters: Notify,
}

impl CancellationToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token. Later calls are ignored.
    ///
    /// Registered callbacks run on the calling thread; a panicking callback is
    /// logged and does not stop the others.
    pub fn cancel(&self, reason: impl Into<String>) {
        let callbacks = {
            let mut pending = self.pending.lock();
            if self.flag.swap(true, Ordering::AcqRel) {
                return;
            }
            let reason = reason.into();
            debug!(reason = %reason, "Cancellation requested");
            pending.reason = Some(reason);
            std::mem::take(&mut pending.callbacks)
        };

        self.waiters.notify_waiters();
        for callback in &callbacks {
            run_callback(callback);
        }
    }

    /// Registers `callback` to run on cancellation, or runs it now if the
    /// token is already cancelled.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        {
            let mut pending = self.pending.lock();
            if !self.flag.load(Ordering::Acquire) {
                pending.callbacks.push(Box::new(callback));
                return;
            }
        }
        run_callback(&callback);
    }

    /// Returns true once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns the reason given to the first `cancel`.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.pending.lock().reason.clone()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.waiters.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

fn run_callback(callback: &(dyn Fn() + Send + Sync)) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        warn!("Cancellation callback panicked");
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_keeps_first_reason() {
        let token = CancellationToken::new();
        assert!(token.reason().is_none());

        token.cancel("timeout");
        token.cancel("user abort");
        assert!(token.is_cancelled());
        assert_eq!(token.reason().as_deref(), Some("timeout"));
    }

    #[test]
    fn test_callbacks_run_once() {
        let token = CancellationToken::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let early = hits.clone();
        token.on_cancel(move || {
            early.fetch_add(1, Ordering::SeqCst);
        });
        token.cancel("a");
        token.cancel("b");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let late = hits.clone();
        token.on_cancel(move || {
            late.fetch_add(10, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_panicking_callback_does_not_block_others() {
        let token = CancellationToken::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        token.on_cancel(|| panic!("callback failure"));
        token.on_cancel(move || flag.store(true, Ordering::SeqCst));
        token.cancel("stop");

        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_cancel() {
        let token = Arc::new(CancellationToken::new());
        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel("shutdown");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_waiting_on_cancelled_token_returns() {
        let token = CancellationToken::new();
        token.cancel("early");
        token.cancelled().await;
    }
}
