use std::time::Duration;

use backon::ExponentialBuilder;

const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Exponential backoff settings for connection-level failures when talking to the accrual service.
///
/// `max_attempts` counts the first try, so the default policy makes at most three requests, waiting 2s and then 4s
/// in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, min_delay: DEFAULT_MIN_DELAY, max_delay: DEFAULT_MAX_DELAY }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, min_delay: Duration, max_delay: Duration) -> Self {
        Self { max_attempts, min_delay, max_delay }
    }

    /// Retries immediately. Handy in tests.
    pub fn no_delay(max_attempts: usize) -> Self {
        Self { max_attempts, min_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}
