//! Bounded retry for transient Admin API failures.
//!
//! This is the per-request transport retry; it is orthogonal to the
//! engine's batch-level retry and deliberately short so a genuine
//! outage surfaces to the batch quickly.

use std::future::Future;
use std::time::Duration;

use crate::api::ApiError;

/// Tunable parameters for the transport retry.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Run `op` up to `config.max_attempts` times, retrying only when the
/// error is transient ([`ApiError::is_transient`]). Non-transient
/// errors return immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < config.max_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %err,
                    "Transient Shopware error, retrying",
                );
                tokio::time::sleep(config.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
