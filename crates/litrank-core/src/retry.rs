//! Retry with exponential backoff for transient adapter failures (§4.1).

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(10) }
    }
}

/// The retry policy used by every bibliographic adapter: 3 attempts,
/// 1s base backoff doubling up to a 10s cap.
pub fn api_retry_config() -> RetryConfig {
    RetryConfig::default()
}

/// Run `operation`, retrying up to `config.max_attempts` times on `Err` with
/// exponential backoff. `should_retry` decides whether a given error is worth
/// retrying at all (e.g. a 429 should short-circuit to an empty result
/// instead of burning the retry budget, per §4.1's error policy).
pub async fn with_retry<T, E, F, Fut>(config: RetryConfig, mut should_retry: impl FnMut(&E) -> bool, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    let mut delay = config.base_delay;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(config.max_delay);
            }
        }
    }
}
