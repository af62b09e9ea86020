//! Shutdown coordinator.
//!
//! The coordinator starts every registered worker, waits for the merged
//! shutdown token to cancel, and then gives the workers a bounded grace
//! period to report completion.
//!
//! Once the grace period elapses the coordinator returns even if workers are
//! still running. It never stops them; callers that need hard termination
//! must layer it on top.

use crate::cancellation::{CancellationToken, CompletionTracker, TriggerSource};
use crate::config::CoordinatorConfig;
use crate::errors::Result;
use crate::worker::Worker;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, debug_span, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Coordinates the shutdown of a set of workers.
///
/// A coordinator is consumed by [`run`](Self::run) and cannot be reused.
pub struct ShutdownCoordinator {
    config: CoordinatorConfig,
    parent: Option<Arc<CancellationToken>>,
    workers: Vec<Box<dyn Worker>>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with no workers and no parent token.
    #[must_use]
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            parent: None,
            workers: Vec::new(),
        }
    }

    /// Sets a parent token whose cancellation also triggers shutdown.
    #[must_use]
    pub fn with_parent(mut self, parent: Arc<CancellationToken>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Registers a worker.
    #[must_use]
    pub fn worker<W: Worker + 'static>(mut self, worker: W) -> Self {
        self.workers.push(Box::new(worker));
        self
    }

    /// Registers several already-boxed workers.
    #[must_use]
    pub fn workers<I>(mut self, workers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Worker>>,
    {
        self.workers.extend(workers);
        self
    }

    /// Returns the number of registered workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Runs the workers until shutdown is triggered and the grace period
    /// resolves.
    ///
    /// Must be called from within a tokio runtime. The returned future
    /// completes once every worker has reported completion after the
    /// shutdown trigger, or once the grace period has elapsed, whichever
    /// comes first.
    ///
    /// SIGINT and SIGTERM are intercepted only while the run is in progress.
    /// On Unix their default action (terminating the process) is restored
    /// once the run returns and no other run is listening.
    pub async fn run(self) {
        let span = info_span!(
            "shutdown_coordinator",
            run_id = %Uuid::new_v4(),
            workers = self.workers.len(),
        );
        self.run_inner().instrument(span).await;
    }

    async fn run_inner(self) {
        let grace_period = self.config.grace_period();
        let source = TriggerSource::new(self.parent).with_signals(self.config.listen_for_signals);
        let token = Arc::clone(source.token());
        let tracker = Arc::new(CompletionTracker::new());

        // Register every slot before any worker runs so an early finisher
        // cannot drive the count to zero while others are still pending.
        let registrations: Vec<_> = self
            .workers
            .into_iter()
            .map(|worker| {
                let completion = tracker.register(worker.name());
                (worker, completion)
            })
            .collect();

        for (worker, completion) in registrations {
            let token = Arc::clone(&token);
            let span = debug_span!("worker", name = %worker.name());
            tokio::spawn(
                async move {
                    debug!("Worker started");
                    worker.run_until_cancelled_or_done(token, completion).await;
                    debug!("Worker returned");
                }
                .instrument(span),
            );
        }

        // Triggers are connected only after every worker has been started.
        let mut trigger = source.arm();
        info!("Workers started, waiting for shutdown trigger");

        token.cancelled().await;
        trigger.release();

        info!(grace_period = ?grace_period, "Shutdown requested, waiting for workers");

        match tokio::time::timeout(grace_period, tracker.wait()).await {
            Ok(()) => info!("All workers completed"),
            Err(_) => warn!(
                outstanding = tracker.remaining(),
                "Grace period elapsed before all workers completed"
            ),
        }
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("config", &self.config)
            .field("has_parent", &self.parent.is_some())
            .field("workers", &self.workers)
            .finish()
    }
}

/// Runs `workers` until `parent` is cancelled or the process receives an
/// interrupt or termination signal, then waits up to `grace_period` for
/// them to complete.
///
/// The grace period is honoured exactly, including sub-millisecond parts.
/// Once this returns, SIGINT and SIGTERM terminate the process again unless
/// another coordinator is still running.
pub async fn run(
    parent: Option<Arc<CancellationToken>>,
    grace_period: Duration,
    workers: Vec<Box<dyn Worker>>,
) {
    let mut coordinator =
        ShutdownCoordinator::new(CoordinatorConfig::new().with_grace_period(grace_period))
            .workers(workers);
    coordinator.parent = parent;
    coordinator.run().await;
}

/// Runs a coordinator to completion on a dedicated multi-thread runtime.
///
/// Workers still running when this returns are detached from the caller;
/// the runtime is shut down in the background rather than joined.
///
/// # Panics
///
/// Panics if called from within an async context (a thread already driving
/// a tokio runtime). Use [`ShutdownCoordinator::run`] there instead.
pub fn run_blocking(
    config: CoordinatorConfig,
    parent: Option<Arc<CancellationToken>>,
    workers: Vec<Box<dyn Worker>>,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let mut coordinator = ShutdownCoordinator::new(config).workers(workers);
    coordinator.parent = parent;
    runtime.block_on(coordinator.run());
    runtime.shutdown_background();

    Ok(())
}
