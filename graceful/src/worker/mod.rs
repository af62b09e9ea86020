//! Worker trait and implementations.
//!
//! Workers are the independently running units a coordinator starts and
//! later waits for during shutdown.

use crate::cancellation::{CancellationToken, CompletionHandle};
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Trait for workers managed by a shutdown coordinator.
///
/// A worker must report completion exactly once, whether it finishes
/// normally, fails, or stops because the token was cancelled. Handing the
/// [`CompletionHandle`] to a detached task is allowed; dropping it counts as
/// completion.
///
/// Cancellation is cooperative. A worker that ignores the token and outlives
/// the grace period is abandoned, not stopped: the coordinator guarantees a
/// bounded return, not a bounded worker lifetime.
#[async_trait]
pub trait Worker: Send + Sync + Debug {
    /// Returns the name of the worker.
    fn name(&self) -> &str;

    /// Runs until the work is done or the token is cancelled.
    ///
    /// # Arguments
    ///
    /// * `cancellation` - The merged shutdown token to observe
    /// * `completion` - The handle to report completion with
    async fn run_until_cancelled_or_done(
        &self,
        cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    );
}

/// An async function-based worker.
pub struct FnWorker<F, Fut>
where
    F: Fn(Arc<CancellationToken>, CompletionHandle) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    name: String,
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnWorker<F, Fut>
where
    F: Fn(Arc<CancellationToken>, CompletionHandle) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    /// Creates a new function-based worker.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for FnWorker<F, Fut>
where
    F: Fn(Arc<CancellationToken>, CompletionHandle) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnWorker").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> Worker for FnWorker<F, Fut>
where
    F: Fn(Arc<CancellationToken>, CompletionHandle) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_until_cancelled_or_done(
        &self,
        cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    ) {
        (self.func)(cancellation, completion).await;
    }
}

/// A worker that waits for cancellation and then reports completion.
#[derive(Debug, Clone)]
pub struct IdleWorker {
    name: String,
}

impl IdleWorker {
    /// Creates a new idle worker.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Worker for IdleWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_until_cancelled_or_done(
        &self,
        cancellation: Arc<CancellationToken>,
        completion: CompletionHandle,
    ) {
        cancellation.cancelled().await;
        completion.complete();
    }
}
