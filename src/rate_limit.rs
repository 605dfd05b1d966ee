//! Token-bucket rate limiter for provider requests.

use crate::error::{ResolveError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

const MIN_WAIT: Duration = Duration::from_millis(1);

/// Rate limiter that paces calls to a single provider.
///
/// Uses a token-bucket algorithm. Clones share the same bucket, so one
/// limiter per provider is enough for every concurrent lookup in the process.
/// Waiters are not served in FIFO order.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

#[derive(Debug)]
struct RateLimiterInner {
    /// Tokens added per second.
    rate: f64,
    /// Burst capacity.
    capacity: f64,
    /// Tokens currently available.
    tokens: f64,
    /// Time of the last refill.
    last_refill: Instant,
}

impl RateLimiterInner {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }
}

impl RateLimiter {
    /// Create a limiter that adds `rate` tokens per second.
    ///
    /// Capacity defaults to `max(1, rate)` so that acquires still progress
    /// when `0 < rate < 1`.
    pub fn new(rate: f64) -> Result<Self> {
        Self::with_capacity(rate, rate.max(1.0))
    }

    /// Create a limiter with an explicit burst capacity.
    pub fn with_capacity(rate: f64, capacity: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ResolveError::InvalidRateLimit(format!(
                "rate must be greater than 0 (got {rate})"
            )));
        }
        // A bucket that can never hold a whole token would never grant one.
        if !capacity.is_finite() || capacity < 1.0 {
            return Err(ResolveError::InvalidRateLimit(format!(
                "capacity must be at least 1 (got {capacity})"
            )));
        }

        tracing::debug!(rate, capacity, "rate limiter initialized");

        Ok(Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                rate,
                capacity,
                tokens: capacity,
                last_refill: Instant::now(),
            })),
        })
    }

    /// Wait until a token is available, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut inner = self.inner.lock().await;
                inner.refill();
                if inner.tokens >= 1.0 {
                    inner.tokens -= 1.0;
                    return;
                }
                (1.0 - inner.tokens) / inner.rate
            };

            tracing::debug!(wait_secs = wait, "no token available, waiting");
            // Refill rounding can leave a sub-nanosecond deficit.
            let wait = Duration::from_secs_f64(wait).max(MIN_WAIT);
            tokio::time::sleep(wait).await;
        }
    }

    #[cfg(test)]
    async fn available(&self) -> f64 {
        let mut inner = self.inner.lock().await;
        inner.refill();
        inner.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_rate() {
        assert!(matches!(
            RateLimiter::new(0.0),
            Err(ResolveError::InvalidRateLimit(_))
        ));
        assert!(RateLimiter::new(-2.5).is_err());
        assert!(RateLimiter::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_non_positive_capacity() {
        assert!(RateLimiter::with_capacity(5.0, 0.0).is_err());
        assert!(RateLimiter::with_capacity(5.0, -1.0).is_err());
    }

    #[test]
    fn test_rejects_fractional_capacity() {
        assert!(matches!(
            RateLimiter::with_capacity(5.0, 0.5),
            Err(ResolveError::InvalidRateLimit(_))
        ));
        assert!(RateLimiter::with_capacity(5.0, 0.999).is_err());
        assert!(RateLimiter::with_capacity(5.0, 1.0).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_smallest_capacity_keeps_granting() {
        let limiter = RateLimiter::with_capacity(0.25, 1.0).unwrap();
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(60), limiter.acquire())
                .await
                .expect("acquire should return once a token refills");
        }
    }

    #[tokio::test]
    async fn test_rate_limiter_first_request_immediate() {
        let limiter = RateLimiter::new(1.0).unwrap();
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_burst_up_to_capacity_then_paced() {
        let limiter = RateLimiter::new(100.0).unwrap();
        let start = Instant::now();

        // 100 tokens of burst, the 101st has to wait ~10ms.
        for _ in 0..101 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_one_rate_still_progresses() {
        let limiter = RateLimiter::new(0.5).unwrap();
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;

        // Second token needs 2 seconds at 0.5 tokens/s.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1900));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_bucket() {
        let limiter = RateLimiter::with_capacity(1.0, 1.0).unwrap();
        let other = limiter.clone();

        limiter.acquire().await;
        assert!(other.available().await < 1.0);

        let start = Instant::now();
        other.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_are_paced() {
        let limiter = RateLimiter::with_capacity(10.0, 1.0).unwrap();
        let start = Instant::now();

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // One immediate, four more at 100ms each.
        assert!(start.elapsed() >= Duration::from_millis(390));
    }
}
