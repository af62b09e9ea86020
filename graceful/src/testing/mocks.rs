//! Mock workers for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cancellation::{CancellationToken, CompletionHandle};
use crate::worker::Worker;

/// A worker that waits for cancellation, then takes `delay` to shut down.
#[derive(Debug)]
pub struct SlowWorker {
    name: String,
    delay: Duration,
    completed: Arc<AtomicBool>,
}

impl SlowWorker {
    /// Creates a slow worker. A zero delay completes as soon as cancelled.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            completed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a flag that flips once the worker has reported completion.
    #[must_use]
    pub fn completed_flag(&self) -> Arc<AtomicBool> {
        self.completed.clone()
    }
}

#[async_trait]
impl Worker for SlowWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_until_cancelled_or_done(
        &self,
        cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    ) {
        cancellation.cancelled().await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.store(true, Ordering::SeqCst);
        completion.complete();
    }
}

/// A worker that ignores cancellation and never reports completion.
#[derive(Debug)]
pub struct StubbornWorker {
    name: String,
}

impl StubbornWorker {
    /// Creates a stubborn worker.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Worker for StubbornWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_until_cancelled_or_done(
        &self,
        _cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    ) {
        // Holding the handle forever keeps its slot outstanding.
        let _completion = completion;
        std::future::pending::<()>().await;
    }
}

/// A worker that panics after observing cancellation, without reporting.
#[derive(Debug)]
pub struct PanickingWorker {
    name: String,
}

impl PanickingWorker {
    /// Creates a panicking worker.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Worker for PanickingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_until_cancelled_or_done(
        &self,
        cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    ) {
        let _completion = completion;
        cancellation.cancelled().await;
        panic!("worker {} failed during shutdown", self.name);
    }
}

/// A worker that runs a bounded task and completes without ever looking at
/// the token.
#[derive(Debug)]
pub struct BoundedTaskWorker {
    name: String,
    duration: Duration,
}

impl BoundedTaskWorker {
    /// Creates a worker whose task takes `duration`.
    #[must_use]
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

#[async_trait]
impl Worker for BoundedTaskWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_until_cancelled_or_done(
        &self,
        _cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    ) {
        tokio::time::sleep(self.duration).await;
        completion.complete();
    }
}

/// Something a [`RecordingWorker`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// The worker began running; `cancelled` is the token state at that moment.
    Started {
        /// Worker name.
        worker: String,
        /// Whether the token was already cancelled.
        cancelled: bool,
    },
    /// The worker observed cancellation.
    Cancelled {
        /// Worker name.
        worker: String,
    },
    /// The worker reported completion.
    Completed {
        /// Worker name.
        worker: String,
    },
}

/// A shared, ordered log of worker events.
#[derive(Debug, Default)]
pub struct WorkerLog {
    events: Mutex<Vec<WorkerEvent>>,
}

impl WorkerLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&self, event: WorkerEvent) {
        self.events.lock().push(event);
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<WorkerEvent> {
        self.events.lock().clone()
    }
}

/// A worker that records its lifecycle into a [`WorkerLog`].
#[derive(Debug)]
pub struct RecordingWorker {
    name: String,
    log: Arc<WorkerLog>,
}

impl RecordingWorker {
    /// Creates a recording worker.
    #[must_use]
    pub fn new(name: impl Into<String>, log: Arc<WorkerLog>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

#[async_trait]
impl Worker for RecordingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_until_cancelled_or_done(
        &self,
        cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    ) {
        self.log.record(WorkerEvent::Started {
            worker: self.name.clone(),
            cancelled: cancellation.is_cancelled(),
        });

        cancellation.cancelled().await;
        self.log.record(WorkerEvent::Cancelled {
            worker: self.name.clone(),
        });

        completion.complete();
        self.log.record(WorkerEvent::Completed {
            worker: self.name.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CompletionTracker;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_recording_worker_lifecycle() {
        let log = Arc::new(WorkerLog::new());
        let worker = RecordingWorker::new("rec", log.clone());
        let tracker = Arc::new(CompletionTracker::new());
        let token = Arc::new(CancellationToken::new());
        token.cancel("stop");

        worker
            .run_until_cancelled_or_done(token, tracker.register("rec"))
            .await;

        assert_eq!(
            log.events(),
            vec![
                WorkerEvent::Started {
                    worker: "rec".to_string(),
                    cancelled: true,
                },
                WorkerEvent::Cancelled {
                    worker: "rec".to_string(),
                },
                WorkerEvent::Completed {
                    worker: "rec".to_string(),
                },
            ]
        );
        assert!(tracker.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_worker_sets_flag() {
        let worker = SlowWorker::new("slow", Duration::from_millis(30));
        let flag = worker.completed_flag();
        let tracker = Arc::new(CompletionTracker::new());
        let token = Arc::new(CancellationToken::new());
        token.cancel("stop");

        worker
            .run_until_cancelled_or_done(token, tracker.register("slow"))
            .await;

        assert!(flag.load(Ordering::SeqCst));
        assert!(tracker.is_complete());
    }
}
