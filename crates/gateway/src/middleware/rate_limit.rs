//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use paperlens_common::config::RateLimitConfig;
use paperlens_common::errors::AppError;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Process-wide token bucket
pub struct GlobalRateLimiter {
    limiter: DefaultDirectRateLimiter,
    requests_per_second: NonZeroU32,
}

impl GlobalRateLimiter {
    /// Zero rates are raised to one; a zero burst falls back to the rate.
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(rate);

        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            requests_per_second: rate,
        }
    }

    /// Take one token, returning false when the bucket is empty
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

/// Limiter for the configured quota, `None` when limiting is switched off
pub fn from_config(config: &RateLimitConfig) -> Option<Arc<GlobalRateLimiter>> {
    config
        .enabled
        .then(|| Arc::new(GlobalRateLimiter::new(config.requests_per_second, config.burst)))
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<Option<Arc<GlobalRateLimiter>>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match limiter {
        Some(limiter) if !limiter.check() => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            Err(AppError::RateLimited {
                limit: limiter.requests_per_second.get(),
            })
        }
        _ => Ok(next.run(request).await),
    }
}
