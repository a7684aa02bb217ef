//! Gateway data model.
//!
//! `ApiKey` and `Subscription` are owned by account management outside this
//! core; the gateway reads them and only ever writes the last-used bump.
//! `UsageRecord` is owned and exclusively written by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A credential issued to a principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Opaque key identifier.
    pub id: String,

    /// Hex SHA-256 of the secret. The secret itself is never persisted.
    pub key_hash: String,

    /// Owning principal.
    pub principal: String,

    /// Requests allowed per rate-limit window.
    pub rate_limit: u32,

    pub active: bool,

    pub expires_at: Option<DateTime<Utc>>,

    /// Bumped best-effort by the gateway on successful resolution.
    pub last_used: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// A key resolves only while active and before its expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|t| t > now)
    }
}

/// A registered upstream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetApi {
    pub id: String,

    pub name: String,

    /// Base URL requests are forwarded to.
    pub base_url: String,

    /// Outbound credential the gateway holds on the principal's behalf.
    /// Substituted for the inbound authentication header when present.
    pub upstream_api_key: Option<String>,

    /// Inactive targets never accept proxied traffic.
    pub active: bool,
}

/// Binds a principal to a target API with a monthly request ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub principal: String,

    pub target: String,

    /// Calendar-month request ceiling.
    pub monthly_limit: u64,

    pub active: bool,

    pub created_at: DateTime<Utc>,

    pub expires_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|t| t > now)
    }
}

/// An immutable, append-only fact about one proxied attempt.
///
/// Written for every attempt that reaches the forwarder, whether the
/// upstream replied or the connection failed outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub target: String,
    pub principal: String,
    pub key: String,
    pub method: String,
    pub path: String,
    /// Upstream status, or the synthetic 5xx the gateway assigned on a
    /// connection-level failure.
    pub status_code: u16,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    /// Best-effort client country, as stamped by the edge.
    pub country: String,
    /// Present when the attempt failed at the connection level.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn inactive_key_is_not_usable() {
        let now = Utc::now();
        let key = ApiKey {
            id: "k1".into(),
            key_hash: "abc".into(),
            principal: "p1".into(),
            rate_limit: 100,
            active: false,
            expires_at: None,
            last_used: None,
        };
        assert!(!key.is_usable(now));
    }

    #[test]
    fn expired_key_is_not_usable() {
        let now = Utc::now();
        let key = ApiKey {
            id: "k1".into(),
            key_hash: "abc".into(),
            principal: "p1".into(),
            rate_limit: 100,
            active: true,
            expires_at: Some(now - Duration::seconds(1)),
            last_used: None,
        };
        assert!(!key.is_usable(now));
        let mut future = key;
        future.expires_at = Some(now + Duration::hours(1));
        assert!(future.is_usable(now));
    }

    #[test]
    fn subscription_expiry_honored() {
        let now = Utc::now();
        let sub = Subscription {
            principal: "p1".into(),
            target: "t1".into(),
            monthly_limit: 1000,
            active: true,
            created_at: now - Duration::days(30),
            expires_at: Some(now - Duration::days(1)),
        };
        assert!(!sub.is_active(now));
    }
}
