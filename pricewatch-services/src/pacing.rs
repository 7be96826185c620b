//! Inter-batch pacing
//!
//! Keeps total throughput under a requests-per-minute budget by pausing
//! between batches. A batch of `B` requests costs `(60 / R) * B` seconds of
//! budget, so that is how long the pacer waits before the next batch starts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

/// Delay to insert after a batch of `batch_size` requests.
///
/// No budget (`None` or `0`) means no delay. Any result that is not a positive
/// finite number of seconds also collapses to zero.
pub fn inter_batch_delay(batch_size: usize, requests_per_minute: Option<u32>) -> Duration {
    let rate = match requests_per_minute {
        Some(rate) if rate > 0 => rate as f64,
        _ => return Duration::ZERO,
    };

    let secs = (60.0 / rate) * batch_size as f64;
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs)
}

/// Sleeps between batches according to a fixed delay
#[derive(Debug)]
pub struct BatchPacer {
    delay: Duration,
    /// Counter for debugging - pauses taken
    pauses: AtomicU64,
    /// Counter for debugging - total time spent waiting, in ms
    waited_ms: AtomicU64,
}

impl BatchPacer {
    pub fn new(batch_size: usize, requests_per_minute: Option<u32>) -> Self {
        Self::with_delay(inter_batch_delay(batch_size, requests_per_minute))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            pauses: AtomicU64::new(0),
            waited_ms: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait before the next batch. Returns immediately when the delay is zero.
    pub async fn pause(&self) {
        if self.delay.is_zero() {
            debug!("No pacing delay configured, starting next batch immediately");
            return;
        }

        info!(
            "Waiting for {:.2} seconds to respect rate limit...",
            self.delay.as_secs_f64()
        );
        tokio::time::sleep(self.delay).await;

        self.pauses.fetch_add(1, Ordering::Relaxed);
        self.waited_ms
            .fetch_add(self.delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Get statistics about this pacer (for debugging)
    pub fn stats(&self) -> PacerStats {
        PacerStats {
            pauses: self.pauses.load(Ordering::Relaxed),
            waited_ms: self.waited_ms.load(Ordering::Relaxed),
            delay_ms: self.delay.as_millis() as u64,
        }
    }
}

/// Statistics about pacer usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacerStats {
    pub pauses: u64,
    pub waited_ms: u64,
    pub delay_ms: u64,
}
