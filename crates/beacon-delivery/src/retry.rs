//! Exponential backoff retry policy.
//!
//! A policy turns any single-attempt async operation into a retrying one.
//! After failed attempt `k` the caller waits `base_delay * 2^(k-1)`; after
//! the last attempt it gives up immediately. There is no jitter and no upper
//! bound on the delay, so very large attempt counts need their own ceiling.

use std::{future::Future, time::Duration};

use beacon_core::Clock;
use serde::{Deserialize, Serialize};

/// Default number of attempts per channel, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay after the first failed attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retry policy applied to every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,

    /// Delay after the first failure; doubles after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, base_delay: DEFAULT_BASE_DELAY }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then try again.
    Retry {
        /// How long to wait before the next attempt
        delay: Duration,
    },
    /// Stop trying.
    GiveUp {
        /// Reason why the operation should not be retried
        reason: String,
    },
}

/// Terminal result of [`RetryPolicy::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded.
    Succeeded {
        /// Value returned by the successful attempt
        value: T,
        /// Attempt number that succeeded (1-based)
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted {
        /// Error from the last attempt
        last_error: E,
        /// Number of attempts made
        attempts: u32,
    },
}

impl RetryPolicy {
    /// Creates a policy; at least one attempt is always made.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay }
    }

    /// Delay before the attempt following failed attempt `attempt`
    /// (1-based), ignoring the attempt limit.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Decides whether to retry after failed attempt `attempt` (1-based).
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp {
                reason: format!("maximum attempts ({}) exceeded", self.max_attempts),
            };
        }

        RetryDecision::Retry { delay: self.backoff(attempt) }
    }

    /// Runs `operation` until it succeeds or the attempt limit is reached.
    ///
    /// `operation` receives the 1-based attempt number. `on_failure` is
    /// called after each failed attempt with the attempt number, the error,
    /// and the wait before the next attempt (`None` after the last one); it
    /// runs before the wait starts. Waiting goes through `clock`, so it
    /// suspends only the calling task.
    pub async fn run<T, E, Op, Fut, F>(
        &self,
        clock: &dyn Clock,
        mut operation: Op,
        mut on_failure: F,
    ) -> RetryOutcome<T, E>
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        F: FnMut(u32, &E, Option<Duration>),
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return RetryOutcome::Succeeded { value, attempts: attempt },
                Err(error) => match self.decide(attempt) {
                    RetryDecision::Retry { delay } => {
                        on_failure(attempt, &error, Some(delay));
                        clock.sleep(delay).await;
                        attempt += 1;
                    },
                    RetryDecision::GiveUp { .. } => {
                        on_failure(attempt, &error, None);
                        return RetryOutcome::Exhausted { last_error: error, attempts: attempt };
                    },
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use beacon_core::TestClock;

    use super::*;

    #[test]
    fn exponential_backoff_doubles_each_attempt() {
        let policy = RetryPolicy { max_attempts: 6, base_delay: Duration::from_millis(1000) };

        let delays = (1..=5).map(|attempt| policy.backoff(attempt)).collect::<Vec<_>>();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(16),
            ]
        );
    }

    #[test]
    fn final_attempt_gives_up_without_delay() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.decide(1), RetryDecision::Retry { delay: Duration::from_millis(1000) });
        assert_eq!(policy.decide(2), RetryDecision::Retry { delay: Duration::from_millis(2000) });
        match policy.decide(3) {
            RetryDecision::GiveUp { reason } => assert!(reason.contains("maximum attempts")),
            RetryDecision::Retry { .. } => unreachable!("should not retry at max attempts"),
        }
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let policy = RetryPolicy { max_attempts: u32::MAX, base_delay: Duration::from_secs(1) };
        assert_eq!(policy.backoff(200), Duration::from_secs(1).saturating_mul(u32::MAX));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::from_millis(5)).max_attempts, 1);
    }

    #[tokio::test]
    async fn run_returns_first_success() {
        let clock = TestClock::new();
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let mut failures = Vec::new();

        let outcome = policy
            .run(
                &clock,
                |attempt| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { if attempt < 3 { Err("boom") } else { Ok(attempt * 10) } }
                },
                |attempt, _error: &&str, wait| failures.push((attempt, wait)),
            )
            .await;

        assert_eq!(outcome, RetryOutcome::Succeeded { value: 30, attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            failures,
            vec![(1, Some(Duration::from_millis(1000))), (2, Some(Duration::from_millis(2000)))]
        );
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(1000), Duration::from_millis(2000)]);
    }

    #[tokio::test]
    async fn run_exhausts_without_trailing_sleep() {
        let clock = TestClock::new();
        let policy = RetryPolicy { max_attempts: 4, base_delay: Duration::from_millis(250) };

        let outcome: RetryOutcome<(), String> = policy
            .run(&clock, |attempt| async move { Err(format!("attempt {attempt}")) }, |_, _, _| {})
            .await;

        assert_eq!(
            outcome,
            RetryOutcome::Exhausted { last_error: "attempt 4".to_string(), attempts: 4 }
        );
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(250), Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }
}
