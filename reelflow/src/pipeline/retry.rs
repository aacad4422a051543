//! Bounded retry with exponential backoff.
//!
//! Every remote call in a zone goes through [`RetryExecutor::execute`]. The
//! executor re-invokes the operation until it succeeds or the attempt budget
//! is spent, then fails with `RetryExhausted` wrapping the final error.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::errors::{ReelflowError, Result};

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * attempt
    Linear,
    /// delay = base
    Constant,
}

/// Jitter applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Exact delays.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// One backoff time unit in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter_strategy: JitterStrategy,
}

fn default_max_attempts() -> usize {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::None,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }

    /// Delay after the given failed attempt (counted from 1).
    #[must_use]
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let base = self.base_delay_ms;
        let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);

        let delay = match self.backoff_strategy {
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(exponent)),
            BackoffStrategy::Linear => base.saturating_mul(u64::from(exponent)),
            BackoffStrategy::Constant => base,
        }
        .min(self.max_delay_ms);

        let jittered = match self.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full if delay > 0 => rand::thread_rng().gen_range(0..=delay),
            JitterStrategy::Equal if delay / 2 > 0 => {
                let half = delay / 2;
                half + rand::thread_rng().gen_range(0..=half)
            }
            JitterStrategy::Full | JitterStrategy::Equal => delay,
        };

        Duration::from_millis(jittered)
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// Attempt budget spent.
    GiveUp,
    /// The error is not worth retrying.
    NotRetryable,
}

/// Wraps fallible async operations with bounded retry.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Creates an executor with the given config.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the config.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decides what to do after `attempt` (counted from 1) failed with `error`.
    #[must_use]
    pub fn decide(&self, attempt: usize, error: &ReelflowError) -> RetryDecision {
        if !error.is_retryable() {
            RetryDecision::NotRetryable
        } else if attempt >= self.config.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.config.delay_after(attempt))
        }
    }

    /// Runs `operation` until it succeeds or the attempt budget is spent.
    ///
    /// Non-retryable errors are returned unchanged after the first attempt.
    /// Exhaustion yields `RetryExhausted` wrapping the last error. The
    /// operation must tolerate being invoked again after a failed attempt.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            warn!(
                operation = label,
                attempt,
                max_attempts = self.config.max_attempts,
                error = %error,
                "Remote call failed"
            );

            match self.decide(attempt, &error) {
                RetryDecision::Retry(delay) => {
                    tracing::debug!(
                        operation = label,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    return Err(ReelflowError::retry_exhausted(attempt, error));
                }
                RetryDecision::NotRetryable => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Exponential);
        assert_eq!(config.jitter_strategy, JitterStrategy::None);
    }

    #[test]
    fn test_exponential_delays_are_powers_of_two_units() {
        let config = RetryConfig::new().with_base_delay_ms(100);

        assert_eq!(config.delay_after(1), Duration::from_millis(200));
        assert_eq!(config.delay_after(2), Duration::from_millis(400));
        assert_eq!(config.delay_after(3), Duration::from_millis(800));
        assert_eq!(config.delay_after(4), Duration::from_millis(1600));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::new()
            .with_base_delay_ms(1000)
            .with_max_delay_ms(5000);

        assert_eq!(config.delay_after(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_linear_and_constant_delays() {
        let linear = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Linear);
        assert_eq!(linear.delay_after(3), Duration::from_millis(300));

        let constant = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Constant);
        assert_eq!(constant.delay_after(4), Duration::from_millis(100));
    }

    #[test]
    fn test_full_jitter_bounded() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::Full);

        for _ in 0..20 {
            assert!(config.delay_after(1) <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_decide() {
        let executor = RetryExecutor::new(RetryConfig::new().with_max_attempts(3));
        let transient = ReelflowError::transient("503");

        assert_eq!(executor.decide(1, &transient), RetryDecision::Retry(Duration::from_secs(2)));
        assert_eq!(executor.decide(3, &transient), RetryDecision::GiveUp);
        assert_eq!(
            executor.decide(1, &ReelflowError::configuration("no key")),
            RetryDecision::NotRetryable
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let executor = RetryExecutor::default();
        let calls = Arc::new(AtomicUsize::new(0));

        for failures in 0..5 {
            calls.store(0, Ordering::SeqCst);
            let result = executor
                .execute("flaky", || {
                    let calls = calls.clone();
                    async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        if n < failures {
                            Err(ReelflowError::transient(format!("attempt {}", n + 1)))
                        } else {
                            Ok(42)
                        }
                    }
                })
                .await;

            assert_eq!(result.unwrap(), 42);
            assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_exhausts_after_five_attempts() {
        let executor = RetryExecutor::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let started = tokio::time::Instant::now();

        let result: Result<()> = executor
            .execute("doomed", || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(ReelflowError::transient(format!("failure {n}")))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match result.unwrap_err() {
            ReelflowError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 5);
                assert_eq!(source.to_string(), "Transient remote error: failure 5");
            }
            other => panic!("unexpected error: {other}"),
        }

        // 2 + 4 + 8 + 16 units, no wait after the final attempt
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_returns_immediately() {
        let executor = RetryExecutor::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let result: Result<()> = executor
            .execute("config", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ReelflowError::configuration("missing GCP_API_KEY"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ReelflowError::Configuration(_))));
    }
}
