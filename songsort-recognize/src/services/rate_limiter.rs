//! Global request pacing
//!
//! One shared cursor for every worker: successive grants are at least
//! `min_interval` apart no matter how many workers are waiting. The tokio
//! mutex queues waiters in request order, so no worker starves.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum spacing between recognizer call starts
#[derive(Debug)]
pub struct RateLimiter {
    last_grant: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_grant: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait for the next slot and return the grant time
    ///
    /// The lock is held across the sleep; that is what serializes grants.
    pub async fn acquire(&self) -> Instant {
        let mut last = self.last_grant.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait_time.as_millis() as u64, "Rate limiting");
                tokio::time::sleep(wait_time).await;
            }
        }

        let granted = Instant::now();
        *last = Some(granted);
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_serial_grants_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(40));
        let mut grants = Vec::new();
        for _ in 0..4 {
            grants.push(limiter.acquire().await);
        }
        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(40));
        }
    }

    #[tokio::test]
    async fn test_concurrent_grants_are_spaced() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(30)));
        let mut set = tokio::task::JoinSet::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            set.spawn(async move { limiter.acquire().await });
        }

        let mut grants = Vec::new();
        while let Some(result) = set.join_next().await {
            grants.push(result.unwrap());
        }
        grants.sort();
        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(30));
        }
    }

    #[tokio::test]
    async fn test_zero_delay_does_not_wait() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
