//! Token-bucket throttle for fan-out updates.

use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};

/// Shared token bucket. Safe to use from many tasks at once.
pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
    period: Duration,
    burst: NonZeroU32,
}

/// Create a limiter that refills one token every `interval / limit` and holds
/// at most `burst` tokens.
///
/// Returns `None` (no throttling) when `burst` or `limit` is zero, or when the
/// refill period rounds down to nothing.
pub fn new_rate_limiter(burst: u32, limit: u32, interval: Duration) -> Option<RateLimiter> {
    if limit == 0 {
        return None;
    }
    let burst = NonZeroU32::new(burst)?;
    let period = interval / limit;
    let quota = Quota::with_period(period)?.allow_burst(burst);

    Some(RateLimiter {
        inner: governor::RateLimiter::direct(quota),
        period,
        burst,
    })
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("period", &self.period)
            .field("burst", &self.burst)
            .finish()
    }
}

impl RateLimiter {
    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }

    /// Time between token refills.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Bucket capacity.
    pub fn burst(&self) -> u32 {
        self.burst.get()
    }
}
