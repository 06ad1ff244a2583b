//! Bounded exponential backoff for provider calls
//!
//! Only errors classified transient by `ClauseMindError::is_transient` are
//! retried; authentication and validation failures propagate immediately.

use crate::config::RetryConfig;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Run an async operation with bounded exponential backoff.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if !e.is_transient() || attempt >= max_attempts {
                    return Err(e);
                }
                let delay = backoff_delay(config.base_delay(), attempt);
                tracing::warn!(
                    "transient failure (attempt {}/{}), retrying in {:?}: {}",
                    attempt,
                    max_attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(base: Duration, attempt: usize) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1) as u32)
}
