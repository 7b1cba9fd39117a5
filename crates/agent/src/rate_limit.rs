//! Request pacing for the chat model.
//!
//! A token bucket refilled from real call timestamps: at 500 requests per
//! minute with a burst of 1, the first call goes straight through and each
//! later call waits until at least 120 ms after the previous one.

use gitbuddy_config::RateLimitConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct TokenBucket {
    capacity: f64,
    tokens: f64,
    interval: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, interval: Duration) -> Self {
        Self {
            capacity,
            tokens: capacity,
            interval,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        if self.interval > Duration::ZERO {
            let new_tokens = elapsed.as_secs_f64() / self.interval.as_secs_f64();
            self.tokens = (self.tokens + new_tokens).min(self.capacity);
        } else {
            self.tokens = self.capacity;
        }
        self.last_refill = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_token(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) * self.interval.as_secs_f64())
        }
    }
}

/// Shared limiter; clones draw from the same bucket.
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
}

impl RateLimiter {
    /// `requests_per_minute` steady rate with up to `burst` back-to-back calls.
    pub fn per_minute(requests_per_minute: u32, burst: u32) -> Self {
        let interval = Duration::from_nanos(60_000_000_000 / u64::from(requests_per_minute.max(1)));
        let bucket = TokenBucket::new(f64::from(burst.max(1)), interval);
        Self {
            bucket: Arc::new(Mutex::new(bucket)),
        }
    }

    /// Spacing between calls once the burst is spent.
    pub async fn interval(&self) -> Duration {
        self.bucket.lock().await.interval
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                if bucket.try_acquire() {
                    return;
                }
                bucket.time_until_token()
            };
            debug!(wait_ms = wait.as_millis() as u64, "Rate limit: waiting");
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Take a permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        match self.bucket.try_lock() {
            Ok(mut bucket) => bucket.try_acquire(),
            Err(_) => false,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_minute(500, 1)
    }
}

impl From<&RateLimitConfig> for RateLimiter {
    fn from(config: &RateLimitConfig) -> Self {
        Self::per_minute(config.requests_per_minute, config.burst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_is_immediate() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_calls_are_spaced() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.interval().await, Duration::from_millis(120));

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(240));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_refills_the_bucket() {
        let limiter = RateLimiter::default();
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_allows_consecutive_permits() {
        let limiter = RateLimiter::per_minute(60, 2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_the_bucket() {
        let limiter = RateLimiter::from(&RateLimitConfig {
            requests_per_minute: 60,
            burst: 1,
        });
        let other = limiter.clone();
        assert!(limiter.try_acquire());
        assert!(!other.try_acquire());
    }
}
