//! End-to-end shutdown scenarios on a real clock.
//!
//! Bounds here leave room for scheduling noise; exact timer boundaries are
//! asserted by the paused-clock tests in the coordinator module.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use graceful::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Signals readiness, waits for cancellation, acknowledges it, then lingers
/// for `wait` before reporting completion.
#[derive(Debug)]
struct ScenarioWorker {
    name: String,
    wait: Duration,
    ready: mpsc::UnboundedSender<()>,
    finished: Arc<AtomicUsize>,
}

#[async_trait]
impl Worker for ScenarioWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_until_cancelled_or_done(
        &self,
        cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    ) {
        let _ = self.ready.send(());
        cancellation.cancelled().await;
        if !self.wait.is_zero() {
            tokio::time::sleep(self.wait).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        completion.complete();
    }
}

/// Measured shutdown of one coordinator run.
struct Outcome {
    /// Time from the cancellation to the coordinator's return.
    latency: Duration,
    /// Workers that had finished their lingering when the coordinator returned.
    finished: usize,
}

async fn shutdown_latency(grace: Duration, waits: &[Duration]) -> Duration {
    run_scenario(grace, waits).await.latency
}

/// Runs the workers and cancels once all are ready.
async fn run_scenario(grace: Duration, waits: &[Duration]) -> Outcome {
    let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
    let finished = Arc::new(AtomicUsize::new(0));
    let workers: Vec<Box<dyn Worker>> = waits
        .iter()
        .enumerate()
        .map(|(i, wait)| {
            Box::new(ScenarioWorker {
                name: format!("worker-{i}"),
                wait: *wait,
                ready: ready_tx.clone(),
                finished: finished.clone(),
            }) as Box<dyn Worker>
        })
        .collect();
    drop(ready_tx);

    let parent = Arc::new(CancellationToken::new());
    let cancelled_at = Arc::new(parking_lot::Mutex::new(None));

    let trigger = {
        let parent = parent.clone();
        let cancelled_at = cancelled_at.clone();
        let expected = waits.len();
        tokio::spawn(async move {
            for _ in 0..expected {
                ready_rx.recv().await;
            }
            *cancelled_at.lock() = Some(Instant::now());
            parent.cancel("scenario shutdown");
        })
    };

    let config = CoordinatorConfig::new()
        .with_grace_period(grace)
        .with_signals(false);
    ShutdownCoordinator::new(config)
        .with_parent(parent)
        .workers(workers)
        .run()
        .await;
    let returned_at = Instant::now();
    let finished = finished.load(Ordering::SeqCst);

    trigger.await.unwrap();
    let cancelled_at = (*cancelled_at.lock()).expect("trigger ran");
    Outcome {
        latency: returned_at.duration_since(cancelled_at),
        finished,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn prompt_workers_return_before_grace_period() {
    let latency =
        shutdown_latency(Duration::from_millis(200), &[Duration::ZERO, Duration::ZERO]).await;
    assert!(latency < Duration::from_millis(200), "latency {latency:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_worker_is_abandoned_at_grace_period() {
    let latency = shutdown_latency(
        Duration::from_millis(200),
        &[Duration::ZERO, Duration::from_millis(210)],
    )
    .await;

    assert!(latency >= Duration::from_millis(200), "latency {latency:?}");
    assert!(latency < Duration::from_secs(1), "latency {latency:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn coordinator_does_not_wait_for_a_much_slower_worker() {
    let outcome = run_scenario(
        Duration::from_millis(200),
        &[Duration::ZERO, Duration::from_secs(5)],
    )
    .await;

    let latency = outcome.latency;
    assert!(latency >= Duration::from_millis(200), "latency {latency:?}");
    assert!(latency < Duration::from_secs(1), "latency {latency:?}");
    assert_eq!(outcome.finished, 1, "only the prompt worker should have finished");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zero_grace_period_returns_immediately() {
    let latency = shutdown_latency(Duration::ZERO, &[Duration::ZERO]).await;
    assert!(latency < Duration::from_millis(100), "latency {latency:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_workers_skip_the_grace_period() {
    let latency = shutdown_latency(Duration::from_secs(5), &[]).await;
    assert!(latency < Duration::from_millis(100), "latency {latency:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_runs_are_independent() {
    for _ in 0..3 {
        let latency =
            shutdown_latency(Duration::from_millis(500), &[Duration::from_millis(10)]).await;
        assert!(latency < Duration::from_millis(500), "latency {latency:?}");
    }
}
