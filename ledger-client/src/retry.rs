//! Retry Strategy - exponential backoff with jitter for transaction submission

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Backoff parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
    /// Growth factor per retry
    pub backoff_multiplier: f64,
    /// Fraction of the delay randomized either way
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay_ms: 500,
            max_delay_ms: 8000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Runs an operation until it succeeds, fails non-retryably, or exhausts
/// its attempts
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
    metrics: Option<Metrics>,
}

impl RetryStrategy {
    /// Create with explicit parameters
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Create with default parameters
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Count retries into `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Parameters in use
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before retry `attempt` (0-based): exponential, capped, jittered
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);

        let capped_delay = base_delay.min(self.config.max_delay_ms as f64);

        let jitter_range = capped_delay * self.config.jitter_factor;
        let jitter = (rand::random::<f64>() - 0.5) * jitter_range * 2.0;
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }

    /// Execute `operation`, retrying only errors for which
    /// [`Error::is_retryable`] holds
    ///
    /// Exhaustion surfaces as `SubmissionFailed`, carrying the attempt count
    /// and the last transport failure.
    pub async fn execute_with_retry<F, Fut, T>(&self, operation: F, operation_name: &str) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.calculate_delay(attempt - 1);
                warn!(
                    "Retry attempt {}/{} for {} after {:?}",
                    attempt, self.config.max_retries, operation_name, delay
                );
                if let Some(metrics) = &self.metrics {
                    metrics.submit_retries.inc();
                }
                tokio::time::sleep(delay).await;
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            "Operation {} succeeded on retry attempt {}/{}",
                            operation_name, attempt, self.config.max_retries
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        warn!("Non-retryable error for {}: {}", operation_name, e);
                        return Err(e);
                    }

                    warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        operation_name,
                        e
                    );

                    last_error = Some(e);
                }
            }
        }

        Err(Error::SubmissionFailed {
            attempts: self.config.max_retries + 1,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn no_jitter(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn test_exponential_backoff() {
        let strategy = RetryStrategy::new(no_jitter(3));

        assert_eq!(strategy.calculate_delay(0).as_millis(), 1000);
        assert_eq!(strategy.calculate_delay(1).as_millis(), 2000);
        assert_eq!(strategy.calculate_delay(2).as_millis(), 4000);
    }

    #[test]
    fn test_max_delay_cap() {
        let strategy = RetryStrategy::new(no_jitter(10));
        assert_eq!(strategy.calculate_delay(10).as_millis(), 5000);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let strategy = RetryStrategy::new(RetryConfig {
            jitter_factor: 0.1,
            ..no_jitter(3)
        });
        for _ in 0..100 {
            let delay = strategy.calculate_delay(0).as_millis();
            assert!((900..=1100).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_retried_until_success() {
        let strategy = RetryStrategy::new(no_jitter(3));
        let calls = &AtomicU32::new(0);

        let result = strategy
            .execute_with_retry(
                move || async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::Transport("connection reset".into()))
                    } else {
                        Ok(7)
                    }
                },
                "test",
            )
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_submission_failed() {
        let strategy = RetryStrategy::new(no_jitter(2));
        let calls = &AtomicU32::new(0);

        let result: Result<()> = strategy
            .execute_with_retry(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::Transport("timeout".into()))
                },
                "test",
            )
            .await;

        match result {
            Err(Error::SubmissionFailed { attempts, reason }) => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("timeout"));
            }
            other => panic!("expected SubmissionFailed, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_returned_immediately() {
        let strategy = RetryStrategy::new(no_jitter(5));
        let calls = &AtomicU32::new(0);

        let result: Result<()> = strategy
            .execute_with_retry(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::Rpc {
                        code: -32002,
                        message: "blockhash not found".into(),
                    })
                },
                "test",
            )
            .await;

        assert!(matches!(result, Err(Error::Rpc { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
