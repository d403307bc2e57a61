use crate::app_config::RetryConfig;
use lineup_core::error::ApiError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Transport-level retry for transient failures.
///
/// Retrying lives entirely below the orchestration layer: the caller builds
/// one request (including its idempotency key) and every attempt replays it
/// unchanged, so a retried request can never duplicate a side effect.
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            max_backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }

    /// Connection-level failures and 5xx responses are worth replaying;
    /// every 4xx is a definitive answer and is returned as-is.
    pub fn is_transient(error: &ApiError) -> bool {
        match error {
            ApiError::Transport(_) => true,
            ApiError::Api { status, .. } => *status >= 500,
        }
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && Self::is_transient(&err) => {
                    let delay = self.backoff_for(attempt);
                    tracing::warn!(
                        "Transient API failure on attempt {}/{}, retrying in {:?}: {}",
                        attempt,
                        self.max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Exponential backoff with equal jitter, capped at `max_backoff`.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = (attempt - 1).min(16);
        let exp = self
            .base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff);
        let millis = exp.as_millis() as u64;
        let half = millis / 2;
        let jitter = rand::thread_rng().gen_range(0..=half.max(1));
        Duration::from_millis(half + jitter)
    }
}
