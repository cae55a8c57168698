// limiter.rs - Request Rate Limiter
// Purpose: Per-worker base delay with +/- 10% uniform jitter before each probe

use crate::config::JITTER_PERCENTAGE;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Per-request delay with +/- 10% jitter so the request cadence is not uniform.
///
/// Holds no state beyond the base delay; every call draws fresh jitter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    base_delay_ms: u64,
}

impl RateLimiter {
    pub fn new(base_delay_ms: u64) -> Self {
        Self { base_delay_ms }
    }

    pub fn is_unthrottled(&self) -> bool {
        self.base_delay_ms == 0
    }

    /// Draw the next delay, uniform over `[base - jitter, base + jitter]`
    /// with `jitter = floor(base * 0.1)`.
    pub fn next_delay(&self) -> Duration {
        if self.is_unthrottled() {
            return Duration::ZERO;
        }

        let base = self.base_delay_ms as i64;
        let jitter = (self.base_delay_ms as f64 * JITTER_PERCENTAGE).floor() as i64;
        let random_part = rand::thread_rng().gen_range(0..=2 * jitter);
        let actual = (base + random_part - jitter).max(0);

        Duration::from_millis(actual as u64)
    }

    pub async fn wait(&self) {
        if self.is_unthrottled() {
            return;
        }
        sleep(self.next_delay()).await;
    }
}
