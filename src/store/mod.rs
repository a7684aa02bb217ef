//! Store capabilities consumed by the gateway.
//!
//! Every lookup the pipeline performs goes through one of these traits; the
//! gateway never sees persistence details. Handles are injected explicitly
//! at construction, never reached through ambient global state.

pub mod memory;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::{MemoryCounterStore, MemoryStore};
pub use types::{ApiKey, Subscription, TargetApi, UsageRecord};

/// Failure of a backing store. The pipeline decides per-component whether
/// this fails the request (rate limiter: always) or is only logged (usage
/// writes after the response is computed).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Principal/key lookup by credential hash, plus the single narrow write
/// the gateway is allowed: the last-used bump.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Look up a key by the hash of its secret. Returns unusable keys too;
    /// the resolver decides whether they pass.
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError>;

    async fn touch_last_used(&self, key_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Target registry lookup by identifier.
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn find(&self, target_id: &str) -> Result<Option<TargetApi>, StoreError>;
}

/// Subscription lookup by (principal, target). At most one subscription
/// exists per pair; activity and expiry are judged by the quota enforcer.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find(
        &self,
        principal: &str,
        target: &str,
    ) -> Result<Option<Subscription>, StoreError>;
}

/// Append-only usage log. Records are never updated in place, so concurrent
/// writers never conflict.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn append(&self, record: UsageRecord) -> Result<(), StoreError>;

    /// Count records for (principal, target) with `timestamp >= since`.
    async fn count_since(
        &self,
        principal: &str,
        target: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// Post-increment counter value and when its window resets.
#[derive(Debug, Clone, Copy)]
pub struct WindowCount {
    pub count: u64,
    pub reset_at: DateTime<Utc>,
}

/// Shared atomic counter facility for fixed-window rate limiting.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for `key`. The first increment in a
    /// window arms an expiry of `window_secs`; later increments join the
    /// same window. Increment-then-read is a single atomic operation so two
    /// concurrent requests can never both observe a pre-increment value.
    async fn increment(&self, key: &str, window_secs: u64) -> Result<WindowCount, StoreError>;
}
