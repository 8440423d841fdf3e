use std::time::Duration;

///
/// BackoffStrategy
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackoffStrategy {
    /// Wait the initial backoff before every retry.
    Fixed,
    /// Double the wait after each failed attempt, capped at `max`.
    Exponential { max: Duration },
}

///
/// RetryPolicy
///
/// Bounded retry for read transactions that hit transient conflicts.
/// `attempts` counts the first try; it is never below 1.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    attempts: u32,
    initial_backoff: Duration,
    backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RetryPolicy {
    pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(10);
    pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(1);

    #[must_use]
    pub const fn new(attempts: u32) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
            initial_backoff: Self::DEFAULT_INITIAL_BACKOFF,
            backoff: BackoffStrategy::Exponential {
                max: Self::DEFAULT_MAX_BACKOFF,
            },
        }
    }

    #[must_use]
    pub const fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wait after the `failed`-th failed attempt (1-based).
    #[must_use]
    pub fn backoff_after(&self, failed: u32) -> Duration {
        match self.backoff {
            BackoffStrategy::Fixed => self.initial_backoff,
            BackoffStrategy::Exponential { max } => {
                let shift = failed.saturating_sub(1).min(31);
                self.initial_backoff.saturating_mul(1_u32 << shift).min(max)
            }
        }
    }
}

///
/// TESTS
///
