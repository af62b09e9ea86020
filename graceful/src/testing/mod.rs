//! Testing utilities for coordinator users.
//!
//! This module provides mock workers covering the behaviours a coordinator
//! must tolerate: prompt and slow shutdown, workers that ignore the token,
//! workers that panic, and workers that finish before shutdown.

mod mocks;

pub use mocks::{
    BoundedTaskWorker, PanickingWorker, RecordingWorker, SlowWorker, StubbornWorker,
    WorkerEvent, WorkerLog,
};
