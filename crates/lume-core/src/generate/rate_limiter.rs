//! Global rate limiter to avoid generation API throttling

use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_PER_SECOND: NonZeroU32 = match NonZeroU32::new(5) {
    Some(n) => n,
    None => unreachable!(),
};

/// Global rate limiter for all generation requests
pub struct GenerationRateLimiter {
    limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl GenerationRateLimiter {
    /// Create a new rate limiter with the specified requests per second
    pub fn new(requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_PER_SECOND),
        );

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until a request is allowed
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
        debug!("Rate limiter: generation request allowed");
    }

    /// Check if a request can be made immediately
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Clone for GenerationRateLimiter {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl Default for GenerationRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_PER_SECOND.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_bounded() {
        let limiter = GenerationRateLimiter::new(2);
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }

    #[test]
    fn test_clones_share_quota() {
        let limiter = GenerationRateLimiter::new(1);
        let clone = limiter.clone();
        assert!(limiter.check());
        assert!(!clone.check());
    }

    #[test]
    fn test_zero_uses_default() {
        let limiter = GenerationRateLimiter::new(0);
        assert!(limiter.check());
    }
}
