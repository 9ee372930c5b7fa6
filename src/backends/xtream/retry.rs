use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::errors::XtreamApiError;
use crate::config::NetworkConfig;

/// Exponential backoff for Xtream requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_attempts: u32,
    /// First retry waits this long
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Budget for all attempts together
    pub total_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            total_timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        let attempts = config.max_retries.saturating_add(1);
        Self {
            max_attempts: config.max_retries,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
            total_timeout: config.timeout().saturating_mul(attempts)
                + Duration::from_millis(config.retry_max_delay_ms.saturating_mul(attempts as u64)),
        }
    }

    /// No retries; used by the connection check.
    pub fn single_attempt() -> Self {
        Self::new(0, 0, 0)
    }

    /// min(base_delay * 2^attempt, max_delay)
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Runs `f` until it succeeds, fails permanently or the attempts run out.
    /// Returns the last error seen.
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        mut f: F,
    ) -> Result<T, XtreamApiError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, XtreamApiError>>,
    {
        let start_time = std::time::Instant::now();
        let mut last_error = None;

        for attempt in 0..=self.max_attempts {
            if start_time.elapsed() >= self.total_timeout {
                warn!(
                    "{}: Exceeded total timeout of {:?} after {} attempts",
                    operation_name, self.total_timeout, attempt
                );
                break;
            }

            if attempt > 0 {
                debug!(
                    "{}: Retry attempt {} of {}",
                    operation_name, attempt, self.max_attempts
                );
            }

            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("{}: Succeeded after {} retries", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !err.is_transient() {
                        warn!(
                            "{}: Non-transient error, not retrying: {}",
                            operation_name, err
                        );
                        return Err(err);
                    }

                    debug!("{}: Transient error: {}", operation_name, err);
                    last_error = Some(err);

                    if attempt < self.max_attempts {
                        let delay = self.calculate_delay(attempt);
                        debug!(
                            "{}: Waiting {:?} before retry {} of {}",
                            operation_name,
                            delay,
                            attempt + 1,
                            self.max_attempts
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        match last_error {
            Some(err) => {
                warn!(
                    "{}: All {} attempts failed, last error: {}",
                    operation_name,
                    self.max_attempts + 1,
                    err
                );
                Err(err)
            }
            None => Err(XtreamApiError::Other(format!(
                "{}: All attempts failed with no error captured",
                operation_name
            ))),
        }
    }
}
