//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; binaries embedding the
//! coordinator call one of these once at startup to see them.

use crate::errors::{Result, ShutdownError};
use tracing_subscriber::{fmt, EnvFilter};

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Installs a global subscriber, honouring `RUST_LOG` and falling back to
/// `default_level`. Returns an error if a subscriber is already installed.
pub fn try_init_tracing(default_level: &str, format: LogFormat) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| ShutdownError::Tracing(e.to_string()))
}

/// Installs a text subscriber, ignoring an already-installed one.
pub fn init_tracing(default_level: &str) {
    let _ = try_init_tracing(default_level, LogFormat::Text);
}
