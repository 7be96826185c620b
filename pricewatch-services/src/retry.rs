//! Bounded retry for transport failures
//!
//! Only `PriceError::Transport` is retried. Parse failures and "no data"
//! responses are final on the first attempt.

use std::future::Future;
use std::time::Duration;

use pricewatch_core::PriceResult;
use rand::Rng;
use tracing::warn;

/// Longest single backoff
const MAX_DELAY_MS: u64 = 30_000;

/// Exponential backoff retry policy with jitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying
    pub max_retries: u32,
    /// Base delay in milliseconds
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Run `operation`, retrying transport failures up to `max_retries` times.
    ///
    /// `label` identifies the work in log lines.
    pub async fn execute<F, Fut, T>(&self, label: &str, mut operation: F) -> PriceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PriceResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {} - retrying in {}ms",
                        label,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Backoff before retry number `attempt + 1`, with ±10% jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        let jitter_range = exponential / 10;

        let jittered = if jitter_range == 0 {
            exponential
        } else {
            let offset = rand::rng().random_range(0..=jitter_range * 2);
            exponential
                .saturating_add(offset)
                .saturating_sub(jitter_range)
        };

        Duration::from_millis(jittered.min(MAX_DELAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_core::PriceError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_and_is_capped() {
        let policy = RetryPolicy::new(5, 1_000);
        for attempt in 0..4 {
            let expected = 1_000 * 2_u64.pow(attempt);
            let delay = policy.delay_for(attempt).as_millis() as u64;
            assert!(
                delay >= expected - expected / 10 && delay <= expected + expected / 10,
                "attempt {} delay {}",
                attempt,
                delay
            );
        }
        assert_eq!(policy.delay_for(10), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn test_delay_saturates_for_huge_attempts() {
        let policy = RetryPolicy::new(u32::MAX, 1_000);
        for attempt in 50..70 {
            assert_eq!(
                policy.delay_for(attempt),
                Duration::from_millis(MAX_DELAY_MS),
                "attempt {}",
                attempt
            );
        }
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(MAX_DELAY_MS));

        let huge_base = RetryPolicy::new(3, u64::MAX);
        assert_eq!(huge_base.delay_for(0), Duration::from_millis(MAX_DELAY_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transport_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, 100);

        let result = policy
            .execute("flaky item", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PriceError::transport("connection reset"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, 100);

        let result: PriceResult<()> = policy
            .execute("dead item", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PriceError::transport("timed out")) }
            })
            .await;

        assert!(result.unwrap_err().is_transport());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_parse_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, 100);

        let result: PriceResult<()> = policy
            .execute("bad body", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PriceError::parse("expected object")) }
            })
            .await;

        assert!(matches!(result, Err(PriceError::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
