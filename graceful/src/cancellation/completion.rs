//! Completion tracking for registered workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// Counts workers that have not yet reported completion.
///
/// Works like a wait group: each [`register`](Self::register) call adds one
/// outstanding slot and hands back the only [`CompletionHandle`] able to
/// release it.
#[derive(Default)]
pub struct CompletionTracker {
    /// Outstanding workers.
    remaining: AtomicUsize,
    /// Wakes tasks suspended in `wait()` once the count reaches zero.
    notify: Notify,
}

impl CompletionTracker {
    /// Creates a tracker with no outstanding workers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one outstanding worker and returns its completion handle.
    #[must_use]
    pub fn register(self: &Arc<Self>, worker: impl Into<String>) -> CompletionHandle {
        self.remaining.fetch_add(1, Ordering::SeqCst);
        CompletionHandle {
            tracker: Arc::clone(self),
            worker: worker.into(),
            reported: false,
        }
    }

    /// Returns the number of workers that have not reported completion.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Returns true once every registered worker has reported completion.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Waits until every registered worker has reported completion.
    ///
    /// Resolves immediately when nothing is outstanding.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }

    fn complete_one(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));

        if previous == Ok(1) {
            self.notify.notify_waiters();
        }
    }
}

impl std::fmt::Debug for CompletionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTracker")
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// The handle a worker uses to report that it is done.
///
/// [`complete`](Self::complete) consumes the handle, so a worker cannot
/// report twice. A handle dropped without reporting (for example while a
/// panicking worker unwinds) still counts as completed.
pub struct CompletionHandle {
    tracker: Arc<CompletionTracker>,
    worker: String,
    reported: bool,
}

impl CompletionHandle {
    /// Reports that the worker is done.
    pub fn complete(mut self) {
        self.report();
    }

    /// Returns the name of the worker this handle belongs to.
    #[must_use]
    pub fn worker(&self) -> &str {
        &self.worker
    }

    fn report(&mut self) {
        if !self.reported {
            self.reported = true;
            self.tracker.complete_one();
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if !self.reported {
            debug!(
                worker = %self.worker,
                "Completion handle dropped without report, counting worker as done"
            );
            self.report();
        }
    }
}

impl std::fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("worker", &self.worker)
            .field("reported", &self.reported)
            .finish()
    }
}
