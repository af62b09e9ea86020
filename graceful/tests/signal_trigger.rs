//! OS signal triggering. Kept in its own test binary so the signals raised
//! here cannot reach coordinators in other tests.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use graceful::cancellation::SHUTDOWN_REASON;
use graceful::prelude::*;
use nix::sys::signal::{raise, Signal};
use std::sync::Arc;
use std::time::Duration;

async fn run_until_signal(signal: Signal) {
    let worker = graceful::testing::SlowWorker::new("worker", Duration::from_millis(10));
    let done = worker.completed_flag();

    let config = CoordinatorConfig::new().with_grace_period(Duration::from_secs(2));
    let coordinator = ShutdownCoordinator::new(config).worker(worker);

    let raiser = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        raise(signal).expect("raise signal");
    });

    tokio::time::timeout(Duration::from_secs(5), coordinator.run())
        .await
        .expect("coordinator should return after the signal");
    raiser.await.unwrap();

    assert!(done.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn signals_trigger_shutdown_across_repeated_runs() {
    run_until_signal(Signal::SIGTERM).await;
    run_until_signal(Signal::SIGINT).await;

    let parent = Arc::new(CancellationToken::new());
    let guard = merge_cancellation(Some(parent));
    tokio::time::sleep(Duration::from_millis(10)).await;
    raise(Signal::SIGTERM).expect("raise signal");
    // While the guard is held a duplicate signal is absorbed.
    raise(Signal::SIGTERM).expect("raise signal again");

    tokio::time::timeout(Duration::from_secs(5), guard.token().cancelled())
        .await
        .expect("merged token should cancel on SIGTERM");
    assert_eq!(guard.token().reason().as_deref(), Some(SHUTDOWN_REASON));
}
