use crate::db::executor::{BackoffStrategy, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to parse store config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid store config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

///
/// BackoffKind
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    #[default]
    Exponential,
}

///
/// StoreConfig
///
/// Runtime settings for one store. Every field has a default, so a TOML
/// document only needs the keys it overrides:
///
/// ```toml
/// query_attempts = 5
/// initial_backoff_ms = 20
/// backoff = "fixed"
/// ```
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Attempts for retried reads (first/unique/find); values below 1 mean 1.
    pub query_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff: BackoffKind,
    pub max_backoff_ms: u64,
    /// Reactive delivery threads; 0 lets rayon pick.
    pub worker_threads: usize,
    /// Log every parameter rebind at debug level.
    pub log_query_parameters: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            query_attempts: 1,
            initial_backoff_ms: 10,
            backoff: BackoffKind::Exponential,
            max_backoff_ms: 1_000,
            worker_threads: 0,
            log_query_parameters: false,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff == BackoffKind::Exponential && self.max_backoff_ms < self.initial_backoff_ms
        {
            return Err(ConfigError::Invalid {
                field: "max_backoff_ms",
                reason: "must not be below initial_backoff_ms",
            });
        }

        Ok(())
    }

    // ---- builder-style setters ------------------------------------------

    #[must_use]
    pub const fn query_attempts(mut self, attempts: u32) -> Self {
        self.query_attempts = attempts;
        self
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = backoff.as_millis() as u64;
        self
    }

    #[must_use]
    pub const fn backoff(mut self, backoff: BackoffKind) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub const fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    #[must_use]
    pub const fn log_query_parameters(mut self, enabled: bool) -> Self {
        self.log_query_parameters = enabled;
        self
    }

    /// Retry policy applied to retried query reads.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        let strategy = match self.backoff {
            BackoffKind::Fixed => BackoffStrategy::Fixed,
            BackoffKind::Exponential => BackoffStrategy::Exponential {
                max: Duration::from_millis(self.max_backoff_ms),
            },
        };

        RetryPolicy::new(self.query_attempts)
            .with_initial_backoff(Duration::from_millis(self.initial_backoff_ms))
            .with_backoff(strategy)
    }
}

///
/// TESTS
///
