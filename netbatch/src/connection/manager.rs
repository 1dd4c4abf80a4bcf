//! Connection manager: open, retry, escalate.

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};

use super::retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
use crate::config::{DeviceDescriptor, Settings};
use crate::error::ConnectError;
use crate::session::{Session, SessionProvider};

/// Result of acquiring a session for one device.
pub enum ConnectionOutcome<S> {
    /// Session is open (and privileged if the device asked for it).
    Ready(S),

    /// Credentials were rejected. Never retried.
    AuthFailed { user: String },

    /// Every attempt failed and the last one timed out.
    TimedOut { attempts: u32, timeout: Duration },

    /// Every attempt failed; `message` is the last error.
    TransientError { message: String, attempts: u32 },
}

impl<S> ConnectionOutcome<S> {
    /// Whether a session was acquired.
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionOutcome::Ready(_))
    }

    /// Take the session, or the human-readable failure reason.
    pub fn into_session(self) -> Result<S, String> {
        match self {
            ConnectionOutcome::Ready(session) => Ok(session),
            other => Err(other.to_string()),
        }
    }
}

impl<S> fmt::Display for ConnectionOutcome<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionOutcome::Ready(_) => f.write_str("ready"),
            ConnectionOutcome::AuthFailed { user } => {
                write!(f, "authentication failed for user '{user}'")
            }
            ConnectionOutcome::TimedOut { attempts, timeout } => write!(
                f,
                "connection timed out after {timeout:?}; retries exhausted after {attempts} attempt(s)"
            ),
            ConnectionOutcome::TransientError { message, attempts } => write!(
                f,
                "retries exhausted after {attempts} attempt(s): {message}"
            ),
        }
    }
}

impl<S> fmt::Debug for ConnectionOutcome<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionOutcome({self})")
    }
}

/// Wraps a [`SessionProvider`] with bounded retry and privilege escalation.
pub struct ConnectionManager<'a, P, S = TokioSleeper> {
    provider: &'a P,
    settings: &'a Settings,
    backoff: Backoff,
    sleeper: S,
}

impl<'a, P: SessionProvider> ConnectionManager<'a, P> {
    /// Manager using the tokio timer and a fixed 1 second backoff.
    pub fn new(provider: &'a P, settings: &'a Settings) -> Self {
        Self {
            provider,
            settings,
            backoff: Backoff::default(),
            sleeper: TokioSleeper,
        }
    }
}

impl<'a, P: SessionProvider, S: Sleeper> ConnectionManager<'a, P, S> {
    /// Replace the delay source.
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> ConnectionManager<'a, P, T> {
        ConnectionManager {
            provider: self.provider,
            settings: self.settings,
            backoff: self.backoff,
            sleeper,
        }
    }

    /// Replace the backoff between attempts.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Retry policy for a budget; `None` falls back to `Settings.retry`.
    pub fn policy(&self, budget: Option<u32>) -> RetryPolicy {
        RetryPolicy::new(budget.unwrap_or(self.settings.retry)).with_backoff(self.backoff)
    }

    /// Open a session to `device`, retrying transient failures.
    pub async fn acquire(
        &self,
        device: &DeviceDescriptor,
        budget: Option<u32>,
    ) -> ConnectionOutcome<P::Session> {
        let policy = self.policy(budget);
        let credentials = self.settings.credentials_for(device);
        let timeout = self.settings.connect_timeout();
        let target = device.socket_addr();

        let mut attempt = 0;
        let last_error = loop {
            attempt += 1;
            info!(
                "{} ({}): connect attempt {}/{}",
                device.name, target, attempt, policy.max_attempts
            );

            let error = match self.attempt(device, &credentials, timeout).await {
                Ok(session) => {
                    info!("{} ({}): connected on attempt {}", device.name, target, attempt);
                    return ConnectionOutcome::Ready(session);
                }
                Err(e) => e,
            };

            if let ConnectError::AuthFailed { user } = &error {
                warn!(
                    "{} ({}): attempt {} rejected, authentication failed for '{}'",
                    device.name, target, attempt, user
                );
                return ConnectionOutcome::AuthFailed { user: user.clone() };
            }

            warn!("{} ({}): attempt {} failed: {}", device.name, target, attempt, error);

            if !policy.should_retry(attempt, &error) {
                break error;
            }

            let delay = policy.backoff.delay(attempt);
            debug!("{}: retrying in {:?}", device.name, delay);
            self.sleeper.sleep(delay).await;
        };

        warn!(
            "{} ({}): giving up after {} attempt(s)",
            device.name, target, attempt
        );

        match last_error {
            ConnectError::Timeout(timeout) => ConnectionOutcome::TimedOut {
                attempts: attempt,
                timeout,
            },
            ConnectError::AuthFailed { user } => ConnectionOutcome::AuthFailed { user },
            ConnectError::Other(message) => ConnectionOutcome::TransientError {
                message,
                attempts: attempt,
            },
        }
    }

    /// One bounded open, plus escalation when the device wants it.
    async fn attempt(
        &self,
        device: &DeviceDescriptor,
        credentials: &crate::config::Credentials,
        timeout: Duration,
    ) -> Result<P::Session, ConnectError> {
        let mut session = tokio::time::timeout(timeout, self.provider.open(device, credentials))
            .await
            .map_err(|_| ConnectError::Timeout(timeout))??;

        if !device.wants_privilege() {
            return Ok(session);
        }

        match session.enable().await {
            Ok(()) => Ok(session),
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    debug!("{}: close after failed escalation: {}", device.name, close_err);
                }
                Err(ConnectError::Other(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProvider, RecordingSleeper};

    fn settings(retry: u32) -> Settings {
        Settings {
            retry,
            ..Settings::default()
        }
    }

    fn device(name: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(name, "192.0.2.1")
    }

    #[tokio::test]
    async fn test_ready_on_first_attempt() {
        let provider = FakeProvider::new();
        let settings = settings(3);
        let sleeper = RecordingSleeper::default();
        let manager = ConnectionManager::new(&provider, &settings).with_sleeper(sleeper.clone());

        let outcome = manager.acquire(&device("A"), None).await;
        assert!(outcome.is_ready());
        assert_eq!(provider.attempts("A"), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failed_is_never_retried() {
        let provider = FakeProvider::new().fail(
            "C",
            ConnectError::AuthFailed {
                user: "admin".into(),
            },
        );
        let settings = settings(5);
        let sleeper = RecordingSleeper::default();
        let manager = ConnectionManager::new(&provider, &settings).with_sleeper(sleeper.clone());

        let outcome = manager.acquire(&device("C"), None).await;
        assert!(matches!(outcome, ConnectionOutcome::AuthFailed { .. }));
        assert!(outcome.to_string().contains("authentication"));
        assert_eq!(provider.attempts("C"), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_uses_whole_budget() {
        let provider = FakeProvider::new().fail("B", ConnectError::Timeout(Duration::from_secs(10)));
        let settings = settings(3);
        let sleeper = RecordingSleeper::default();
        let manager = ConnectionManager::new(&provider, &settings).with_sleeper(sleeper.clone());

        let outcome = manager.acquire(&device("B"), None).await;
        assert!(matches!(outcome, ConnectionOutcome::TimedOut { attempts: 3, .. }));
        assert!(outcome.to_string().contains("retries exhausted"));
        assert_eq!(provider.attempts("B"), 3);
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(1); 2]);
    }

    #[tokio::test]
    async fn test_explicit_budget_overrides_settings() {
        let provider = FakeProvider::new().fail("B", ConnectError::Other("reset".into()));
        let settings = settings(3);
        let manager =
            ConnectionManager::new(&provider, &settings).with_sleeper(RecordingSleeper::default());

        let outcome = manager.acquire(&device("B"), Some(5)).await;
        match outcome {
            ConnectionOutcome::TransientError { message, attempts } => {
                assert_eq!(message, "reset");
                assert_eq!(attempts, 5);
            }
            other => panic!("unexpected outcome: {other}"),
        }
        assert_eq!(provider.attempts("B"), 5);
    }

    #[tokio::test]
    async fn test_zero_budget_is_one_attempt() {
        let provider = FakeProvider::new().fail("B", ConnectError::Other("refused".into()));
        let settings = settings(3);
        let manager =
            ConnectionManager::new(&provider, &settings).with_sleeper(RecordingSleeper::default());

        let outcome = manager.acquire(&device("B"), Some(0)).await;
        assert!(!outcome.is_ready());
        assert_eq!(provider.attempts("B"), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let provider = FakeProvider::new().fail_first("A", 2, ConnectError::Other("busy".into()));
        let settings = settings(3);
        let manager =
            ConnectionManager::new(&provider, &settings).with_sleeper(RecordingSleeper::default());

        let outcome = manager.acquire(&device("A"), None).await;
        assert!(outcome.is_ready());
        assert_eq!(provider.attempts("A"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_open_is_bounded_by_settings_timeout() {
        let provider = FakeProvider::new().hang("B");
        let settings = Settings {
            retry: 2,
            timeout: 5,
            ..Settings::default()
        };
        let manager = ConnectionManager::new(&provider, &settings);

        let outcome = manager.acquire(&device("B"), None).await;
        match outcome {
            ConnectionOutcome::TimedOut { attempts, timeout } => {
                assert_eq!(attempts, 2);
                assert_eq!(timeout, Duration::from_secs(5));
            }
            other => panic!("unexpected outcome: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failed_escalation_closes_and_retries() {
        let provider = FakeProvider::new().fail_enable("A");
        let settings = settings(2);
        let manager =
            ConnectionManager::new(&provider, &settings).with_sleeper(RecordingSleeper::default());

        let outcome = manager
            .acquire(&device("A").with_secret("enable-pass"), None)
            .await;
        assert!(matches!(outcome, ConnectionOutcome::TransientError { attempts: 2, .. }));
        assert!(outcome.to_string().contains("privilege"));
        assert_eq!(provider.opened(), 2);
        assert_eq!(provider.closed_for("A"), 2);
    }

    #[tokio::test]
    async fn test_escalation_skipped_without_secret() {
        let provider = FakeProvider::new().fail_enable("A");
        let settings = settings(1);
        let manager = ConnectionManager::new(&provider, &settings);

        let outcome = manager.acquire(&device("A"), None).await;
        assert!(outcome.is_ready());
        assert_eq!(provider.enables(), 0);
    }

    #[tokio::test]
    async fn test_exponential_backoff_delays() {
        let provider = FakeProvider::new().fail("B", ConnectError::Other("down".into()));
        let settings = settings(4);
        let sleeper = RecordingSleeper::default();
        let manager = ConnectionManager::new(&provider, &settings)
            .with_backoff(Backoff::Exponential {
                base: Duration::from_secs(1),
                max: Duration::from_secs(3),
            })
            .with_sleeper(sleeper.clone());

        manager.acquire(&device("B"), None).await;
        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3)
            ]
        );
    }
}
