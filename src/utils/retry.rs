//! Whole-term retry policy.
//!
//! A failed term is restarted from scratch after a fixed pause. Rate-limit
//! failures wait longer than other failures. The attempt counter is explicit
//! and the maximum is optional; `None` retries until success.

use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;

/// Default pause after a rate-limit failure
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(300);

/// Default pause after any other failure
pub const DEFAULT_FAILURE_DELAY: Duration = Duration::from_secs(60);

/// How a failure should be retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The generative service reported that our quota is exceeded
    RateLimit,
    /// Anything else
    Other,
}

/// Errors that know which retry delay applies to them
pub trait Classify {
    fn failure_kind(&self) -> FailureKind;

    /// Minimum pause requested by the remote service, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, `None` for unlimited
    pub max_attempts: Option<u32>,
    /// Pause after a rate-limit failure
    pub rate_limit_delay: Duration,
    /// Pause after any other failure
    pub failure_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
            failure_delay: DEFAULT_FAILURE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Cap the number of attempts
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Override both pauses
    pub fn delays(mut self, rate_limit_delay: Duration, failure_delay: Duration) -> Self {
        self.rate_limit_delay = rate_limit_delay;
        self.failure_delay = failure_delay;
        self
    }

    /// Pause to apply before the next attempt
    pub fn delay_for(&self, kind: FailureKind) -> Duration {
        match kind {
            FailureKind::RateLimit => self.rate_limit_delay,
            FailureKind::Other => self.failure_delay,
        }
    }

    /// Pause after `error`: the policy delay for its kind, extended to any
    /// longer wait the service asked for
    pub fn delay_after<E: Classify>(&self, error: &E) -> Duration {
        let delay = self.delay_for(error.failure_kind());
        error.retry_after().map_or(delay, |requested| delay.max(requested))
    }

    /// Whether `attempts` completed attempts use up the budget
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Result of a retried operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded on attempt `attempts`
    Success { value: T, attempts: u32 },
    /// The attempt budget ran out; `error` is the last failure
    Exhausted { error: E, attempts: u32 },
}

/// Run `operation` until it succeeds or the policy gives up.
///
/// The closure receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> RetryResult<T, E>
where
    E: Classify + Display,
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation(attempts).await {
            Ok(value) => {
                if attempts > 1 {
                    tracing::info!(attempts, "Operation succeeded after retrying");
                }
                return RetryResult::Success { value, attempts };
            }
            Err(error) => {
                if policy.is_exhausted(attempts) {
                    tracing::error!(attempts, %error, "Giving up after final attempt");
                    return RetryResult::Exhausted { error, attempts };
                }

                let kind = error.failure_kind();
                let delay = policy.delay_after(&error);
                match kind {
                    FailureKind::RateLimit => tracing::warn!(
                        attempt = attempts,
                        ?delay,
                        "Rate limit exceeded, waiting before retrying"
                    ),
                    FailureKind::Other => tracing::warn!(
                        attempt = attempts,
                        ?delay,
                        %error,
                        "An error occurred, waiting before retrying"
                    ),
                }

                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct TestError(FailureKind);

    #[derive(Debug)]
    struct Throttled(Duration);

    impl Display for Throttled {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "throttled for {:?}", self.0)
        }
    }

    impl Classify for Throttled {
        fn failure_kind(&self) -> FailureKind {
            FailureKind::RateLimit
        }

        fn retry_after(&self) -> Option<Duration> {
            Some(self.0)
        }
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error ({:?})", self.0)
        }
    }

    impl Classify for TestError {
        fn failure_kind(&self) -> FailureKind {
            self.0
        }
    }

    fn instant_policy() -> RetryPolicy {
        RetryPolicy::default().delays(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_default_policy_is_unbounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert!(!policy.is_exhausted(u32::MAX));
        assert_eq!(policy.delay_for(FailureKind::RateLimit), Duration::from_secs(300));
        assert_eq!(policy.delay_for(FailureKind::Other), Duration::from_secs(60));
    }

    #[test]
    fn test_max_attempts_is_at_least_one() {
        let policy = RetryPolicy::default().max_attempts(0);
        assert_eq!(policy.max_attempts, Some(1));
        assert!(policy.is_exhausted(1));
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let policy = instant_policy();
        let call_count = Rc::new(RefCell::new(0));

        let result: RetryResult<&str, TestError> = {
            let call_count = call_count.clone();
            with_retry(&policy, move |_| {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Ok("success")
                }
            })
        }
        .await;

        assert!(matches!(result, RetryResult::Success { value: "success", attempts: 1 }));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test]
    async fn test_retry_passes_attempt_number() {
        let policy = instant_policy();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let result = {
            let seen = seen.clone();
            with_retry(&policy, move |attempt| {
                let seen = seen.clone();
                async move {
                    seen.borrow_mut().push(attempt);
                    if attempt < 4 {
                        Err(TestError(FailureKind::Other))
                    } else {
                        Ok(attempt)
                    }
                }
            })
        }
        .await;

        assert!(matches!(result, RetryResult::Success { value: 4, attempts: 4 }));
        assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_bounded_policy_gives_up() {
        let policy = instant_policy().max_attempts(3);

        let result: RetryResult<(), TestError> =
            with_retry(&policy, |_| async { Err(TestError(FailureKind::Other)) }).await;

        match result {
            RetryResult::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            RetryResult::Success { .. } => panic!("Expected the policy to give up"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_longer_than_other_failures() {
        let policy = RetryPolicy::default();
        let started = tokio::time::Instant::now();

        let result = with_retry(&policy, |attempt| async move {
            match attempt {
                1 => Err(TestError(FailureKind::RateLimit)),
                2 => Err(TestError(FailureKind::Other)),
                _ => Ok(()),
            }
        })
        .await;

        assert!(matches!(result, RetryResult::Success { attempts: 3, .. }));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(360));
        assert!(elapsed < Duration::from_secs(361));
    }

    #[test]
    fn test_delay_after_honours_longer_retry_after() {
        let policy = RetryPolicy::default().delays(Duration::from_secs(10), Duration::from_secs(1));

        assert_eq!(
            policy.delay_after(&Throttled(Duration::from_secs(45))),
            Duration::from_secs(45)
        );
        assert_eq!(
            policy.delay_after(&Throttled(Duration::from_secs(3))),
            Duration::from_secs(10)
        );
        assert_eq!(
            policy.delay_after(&TestError(FailureKind::Other)),
            Duration::from_secs(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_for_requested_pause() {
        let policy = instant_policy();
        let started = tokio::time::Instant::now();

        let result = with_retry(&policy, |attempt| async move {
            if attempt == 1 {
                Err(Throttled(Duration::from_secs(20)))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, RetryResult::Success { attempts: 2, .. }));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20));
        assert!(elapsed < Duration::from_secs(21));
    }
}
