//! Fixed-window rate limiting per credential.
//!
//! The counter store performs increment-then-check as a single atomic
//! operation, so for any window the number of admitted requests never
//! exceeds the ceiling, however many arrive concurrently. Over-ceiling
//! requests leave the counter as-is and the window drains naturally.
//!
//! On counter-store outage the limiter fails closed: unlimited admission
//! would defeat the component's purpose.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::GatewayError;
use crate::store::{ApiKey, CounterStore};

/// Rate-limit state exposed to callers via X-RateLimit-* headers.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: u32,
    /// Requests left in the window; saturates at zero, never negative.
    pub remaining: u32,
    pub reset: DateTime<Utc>,
}

impl RateLimitStatus {
    /// Status for responses produced before the limiter ran (for example a
    /// 401 from key resolution): a full, untouched window.
    pub fn untouched(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            reset: Utc::now() + chrono::Duration::seconds(window_secs as i64),
        }
    }
}

/// Admission decision plus the window state behind it.
#[derive(Debug, Clone)]
pub struct Admission {
    pub admitted: bool,
    pub status: RateLimitStatus,
}

/// Enforces a short-window request ceiling per credential.
pub struct RateLimiter {
    counters: Arc<dyn CounterStore>,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(counters: Arc<dyn CounterStore>, window_secs: u64) -> Self {
        Self { counters, window_secs }
    }

    /// Admit or reject the request for the current window.
    pub async fn check(&self, key: &ApiKey) -> Result<Admission, GatewayError> {
        let counter_key = format!("rate:{}", key.id);
        let window = self
            .counters
            .increment(&counter_key, self.window_secs)
            .await
            .map_err(|e| {
                tracing::error!(key = %key.id, error = %e, "counter store unavailable, failing closed");
                GatewayError::Internal("rate-limit counter unavailable".into())
            })?;

        let limit = u64::from(key.rate_limit);
        let remaining = limit.saturating_sub(window.count);
        Ok(Admission {
            admitted: window.count <= limit,
            status: RateLimitStatus {
                limit: key.rate_limit,
                remaining: remaining.min(u64::from(u32::MAX)) as u32,
                reset: window.reset_at,
            },
        })
    }
}
