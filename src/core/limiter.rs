// src/core/limiter.rs

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::core::error::RateLimitError;

const MAX_RATE: u32 = 1_000_000_000;

/// Token bucket gating inbound API calls.
///
/// The bucket starts full with `burst_size` cells and regains one every
/// `1s / requests_per_second`. `acquire` waits at most `grace` for a cell
/// before giving up.
pub struct RateLimiter {
    bucket: GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    grace: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        // Replenish periods are whole nanoseconds.
        let rps = config.requests_per_second.min(MAX_RATE);
        let rate = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        Self {
            bucket: GovernorRateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            grace: config.grace,
        }
    }

    /// Takes a cell, waiting up to the grace window for one to free up.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        tokio::time::timeout(self.grace, self.bucket.until_ready())
            .await
            .map_err(|_| RateLimitError)
    }

    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}
