//! Bounded retry policy for connection attempts.

use std::future::Future;
use std::time::Duration;

use crate::error::ConnectError;

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),

    /// `base * 2^(attempt-1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the given failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                base.checked_mul(factor).map_or(max, |d| d.min(max))
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(Duration::from_secs(1))
    }
}

/// Max attempts, backoff, and which errors are worth another attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, never less than one.
    pub max_attempts: u32,

    /// Delay between attempts.
    pub backoff: Backoff,

    /// Whether an error allows another attempt.
    pub retryable: fn(&ConnectError) -> bool,
}

impl RetryPolicy {
    /// Policy with `max_attempts` attempts (0 is treated as 1) and the default backoff.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::default(),
            retryable: ConnectError::is_retryable,
        }
    }

    /// Replace the backoff.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Same policy with a different attempt budget.
    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Whether a failed attempt should be followed by another one.
    pub fn should_retry(&self, attempt: u32, error: &ConnectError) -> bool {
        attempt < self.max_attempts && (self.retryable)(error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Source of delays between attempts.
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::default().with_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(7), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_backoff_is_bounded() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(4),
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(2), Duration::from_secs(1));
        assert_eq!(backoff.delay(3), Duration::from_secs(2));
        assert_eq!(backoff.delay(5), Duration::from_secs(4));
        assert_eq!(backoff.delay(40), Duration::from_secs(4));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(3);
        let timeout = ConnectError::Timeout(Duration::from_secs(1));
        let auth = ConnectError::AuthFailed { user: "admin".into() };

        assert!(policy.should_retry(1, &timeout));
        assert!(policy.should_retry(2, &timeout));
        assert!(!policy.should_retry(3, &timeout));
        assert!(!policy.should_retry(1, &auth));
    }
}
