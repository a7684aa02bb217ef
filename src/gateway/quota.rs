//! Monthly quota enforcement per (principal, target) subscription.
//!
//! Current usage is a read-then-compare against the append-only usage log.
//! Two requests arriving at the ceiling can both read a count just under
//! the limit and both be admitted; the monthly window makes that overshoot
//! bounded and accepted. The per-minute rate limiter is the component that
//! must be atomic, not this one.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc};

use crate::error::GatewayError;
use crate::store::{SubscriptionStore, UsageStore};

/// First instant of the calendar month containing `now`, in UTC.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let first = date.with_day(1).unwrap_or(date);
    Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}

/// Confirms an active subscription exists and its monthly ceiling is not
/// yet reached.
pub struct QuotaEnforcer {
    subscriptions: Arc<dyn SubscriptionStore>,
    usage: Arc<dyn UsageStore>,
}

impl QuotaEnforcer {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, usage: Arc<dyn UsageStore>) -> Self {
        Self { subscriptions, usage }
    }

    pub async fn check(&self, principal: &str, target: &str) -> Result<(), GatewayError> {
        let subscription = self
            .subscriptions
            .find(principal, target)
            .await
            .map_err(|e| GatewayError::Internal(format!("subscription lookup failed: {e}")))?;

        let now = Utc::now();
        let subscription = match subscription {
            Some(sub) if sub.is_active(now) => sub,
            _ => {
                return Err(GatewayError::NoActiveSubscription {
                    principal: principal.to_string(),
                    target: target.to_string(),
                })
            }
        };

        let used = self
            .usage
            .count_since(principal, target, month_start(now))
            .await
            .map_err(|e| GatewayError::Internal(format!("usage count failed: {e}")))?;

        if used >= subscription.monthly_limit {
            return Err(GatewayError::QuotaExceeded {
                limit: subscription.monthly_limit,
                used,
            });
        }
        Ok(())
    }
}
