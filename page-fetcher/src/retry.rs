//! Retry policy with exponential backoff
//!
//! Every network fetch goes through here: up to `max_attempts` tries,
//! waiting `base_delay * 2^(attempt-1)` between them, capped at
//! `max_delay`. With the defaults that is 1s, 2s, 4s-capped-to-5s... but
//! only two waits ever happen because the third failure is final.

use site_archiver_core::*;
use std::future::Future;
use std::time::Duration;

/// Backoff configuration for repeated fetch attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given 1-based attempt fails
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run an async operation until it succeeds or attempts run out
    ///
    /// The operation is invoked fresh for each attempt. Failures other
    /// than the last are logged and slept through; the last one is
    /// folded into `FetchError::RetriesExhausted`.
    pub async fn run<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        "Fetch attempt {}/{} failed for {}: {}",
                        attempt,
                        self.max_attempts,
                        url,
                        e
                    );
                    last_error = e.to_string();
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            last_error,
        }
        .into())
    }
}
