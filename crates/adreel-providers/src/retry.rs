//! Exponential-backoff retry for adapter HTTP calls, mirroring
//! `adreel_store::retry::with_retry` but keyed to `ProviderError`'s
//! `is_retryable()` instead of Firestore's precondition semantics.

use std::time::Duration;

use tracing::warn;

use crate::error::{ProviderError, ProviderResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> ProviderResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ProviderResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt);
                warn!(operation, attempt, delay_ms = delay.as_millis() as u64, "provider call failed, retrying: {}", e);
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| ProviderError::Unknown("retry loop exhausted with no error".into())))
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp_delay = config.base_delay_ms.saturating_mul(2u64.pow(attempt));
    Duration::from_millis(exp_delay.min(config.max_delay_ms))
}
