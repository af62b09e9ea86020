//! # Graceful
//!
//! Shutdown coordination for processes made of independent background
//! workers.
//!
//! Graceful gives a process a single place where:
//!
//! - **Triggering**: a caller-supplied token and the process's interrupt and
//!   termination signals are merged into one cancellation event
//! - **Fan-out**: every registered worker observes that event through a
//!   shared [`CancellationToken`](cancellation::CancellationToken)
//! - **Bounded fan-in**: the coordinator waits for workers to report
//!   completion, but never longer than a grace period
//!
//! The coordinator guarantees a bounded return, not a bounded worker
//! lifetime. Workers that ignore cancellation are abandoned once the grace
//! period elapses.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graceful::prelude::*;
//! use std::time::Duration;
//!
//! let config = CoordinatorConfig::new().with_grace_period(Duration::from_secs(5));
//!
//! ShutdownCoordinator::new(config)
//!     .worker(HttpServer::new())
//!     .worker(QueueConsumer::new())
//!     .run()
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cancellation;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod observability;
pub mod testing;
pub mod worker;

pub use coordinator::{run, run_blocking, ShutdownCoordinator};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{
        merge_cancellation, CancellationToken, CompletionHandle, CompletionTracker,
        TriggerGuard, TriggerSource,
    };
    pub use crate::config::CoordinatorConfig;
    pub use crate::coordinator::{run, run_blocking, ShutdownCoordinator};
    pub use crate::errors::ShutdownError;
    pub use crate::observability::{init_tracing, try_init_tracing, LogFormat};
    pub use crate::worker::{FnWorker, IdleWorker, Worker};
}
