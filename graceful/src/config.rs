//! Coordinator configuration.

use crate::errors::{Result, ShutdownError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the grace period in milliseconds.
pub const GRACE_PERIOD_ENV: &str = "GRACEFUL_GRACE_PERIOD_MS";

/// Environment variable toggling the OS signal subscription.
pub const LISTEN_FOR_SIGNALS_ENV: &str = "GRACEFUL_LISTEN_FOR_SIGNALS";

/// Configuration for a shutdown coordinator.
///
/// The grace period is kept as an exact [`Duration`]. Serialized forms and
/// the environment express it in milliseconds (fractions allowed); negative
/// values are treated as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// How long to wait for workers after cancellation.
    #[serde(
        rename = "grace_period_ms",
        with = "millis",
        default = "default_grace_period"
    )]
    grace_period: Duration,
    /// Whether SIGINT/SIGTERM trigger shutdown.
    #[serde(default = "default_listen_for_signals")]
    pub listen_for_signals: bool,
}

fn default_grace_period() -> Duration {
    Duration::from_secs(10)
}

fn default_listen_for_signals() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
            listen_for_signals: default_listen_for_signals(),
        }
    }
}

impl CoordinatorConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Sets the grace period in milliseconds, clamping negative values to zero.
    #[must_use]
    pub fn with_grace_period_ms(mut self, millis: i64) -> Self {
        self.grace_period = Duration::from_millis(u64::try_from(millis).unwrap_or(0));
        self
    }

    /// Sets whether OS signals trigger shutdown.
    #[must_use]
    pub fn with_signals(mut self, enabled: bool) -> Self {
        self.listen_for_signals = enabled;
        self
    }

    /// Returns the grace period.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(GRACE_PERIOD_ENV) {
            let millis: f64 = raw.trim().parse().map_err(|e| {
                ShutdownError::invalid_config(GRACE_PERIOD_ENV, format!("{raw:?}: {e}"))
            })?;
            if millis.is_nan() {
                return Err(ShutdownError::invalid_config(
                    GRACE_PERIOD_ENV,
                    format!("{raw:?} is not a number"),
                ));
            }
            config.grace_period = millis::to_duration(millis);
        }

        if let Some(raw) = lookup(LISTEN_FOR_SIGNALS_ENV) {
            config.listen_for_signals = parse_bool(&raw).ok_or_else(|| {
                ShutdownError::invalid_config(
                    LISTEN_FOR_SIGNALS_ENV,
                    format!("{raw:?} is not a boolean"),
                )
            })?;
        }

        Ok(config)
    }
}

/// Grace periods as (possibly fractional) milliseconds.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn to_duration(millis: f64) -> Duration {
        if millis.is_nan() || millis <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX)
    }

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.subsec_nanos() % 1_000_000 == 0 {
            serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
        } else {
            serializer.serialize_f64(value.as_secs_f64() * 1000.0)
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        f64::deserialize(deserializer).map(to_duration)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
