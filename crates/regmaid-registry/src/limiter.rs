//! Per-host request concurrency and rate limiting.

use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// Bounds in-flight requests and spaces request starts for one host.
#[derive(Debug)]
pub struct RequestLimiter {
    slots: Semaphore,
    interval: Option<Duration>,
    next_start: Mutex<Instant>,
}

/// Held for the duration of one request.
#[derive(Debug)]
pub struct RequestPermit<'a> {
    _slot: Option<SemaphorePermit<'a>>,
}

impl RequestLimiter {
    /// Creates a limiter allowing `max_concurrent` in-flight requests and at
    /// most `per_second` request starts per second (zero disables the rate limit).
    #[must_use]
    pub fn new(max_concurrent: usize, per_second: u32) -> Self {
        let interval = (per_second > 0).then(|| Duration::from_secs(1) / per_second);
        Self {
            slots: Semaphore::new(max_concurrent.max(1)),
            interval,
            next_start: Mutex::new(Instant::now()),
        }
    }

    /// Waits for a free slot and, if rate limited, for the next start time.
    pub async fn acquire(&self) -> RequestPermit<'_> {
        let slot = self.slots.acquire().await.ok();

        if let Some(interval) = self.interval {
            let start = {
                let mut next = self.next_start.lock().await;
                let start = (*next).max(Instant::now());
                *next = start + interval;
                start
            };
            tokio::time::sleep_until(start).await;
        }

        RequestPermit { _slot: slot }
    }

    /// Returns the number of free request slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrency_bound() {
        let limiter = RequestLimiter::new(2, 0);
        let first = limiter.acquire().await;
        let _second = limiter.acquire().await;
        assert_eq!(limiter.available(), 0);

        drop(first);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_allows_one() {
        let limiter = RequestLimiter::new(0, 0);
        let _permit = limiter.acquire().await;
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_spaces_requests() {
        let limiter = RequestLimiter::new(10, 20);
        let started = std::time::Instant::now();

        for _ in 0..3 {
            let _permit = limiter.acquire().await;
        }

        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
