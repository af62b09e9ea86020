//! Cancellation primitives for coordinated shutdown.
//!
//! This module provides:
//! - CancellationToken for cooperative, once-only cancellation
//! - TriggerSource for merging a parent token with OS termination signals
//! - CompletionTracker for counting workers that have not finished yet

mod completion;
mod token;
mod trigger;

pub use completion::{CompletionHandle, CompletionTracker};
pub use token::{CancelCallback, CancellationToken};
pub use trigger::{
    merge_cancellation, TriggerGuard, TriggerOrigin, TriggerSource, SHUTDOWN_REASON,
};
