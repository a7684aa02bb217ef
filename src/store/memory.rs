//! In-memory store backends on DashMap.
//!
//! Reference implementation for tests and single-node deployments. A real
//! deployment swaps these for database/Redis-backed implementations of the
//! same traits; the pipeline is oblivious either way.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{
    ApiKey, CounterStore, KeyStore, StoreError, Subscription, SubscriptionStore, TargetApi,
    TargetStore, UsageRecord, UsageStore, WindowCount,
};

/// In-memory backing for keys, targets, subscriptions, and the usage log.
#[derive(Default)]
pub struct MemoryStore {
    keys: DashMap<String, ApiKey>,
    targets: DashMap<String, TargetApi>,
    subscriptions: DashMap<(String, String), Subscription>,
    usage: Mutex<Vec<UsageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_key(&self, key: ApiKey) {
        self.keys.insert(key.id.clone(), key);
    }

    pub fn insert_target(&self, target: TargetApi) {
        self.targets.insert(target.id.clone(), target);
    }

    pub fn insert_subscription(&self, sub: Subscription) {
        self.subscriptions
            .insert((sub.principal.clone(), sub.target.clone()), sub);
    }

    /// Snapshot of the usage log, oldest first.
    pub fn usage_records(&self) -> Vec<UsageRecord> {
        self.usage
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

fn poisoned(what: &str) -> StoreError {
    StoreError::Unavailable(format!("{what} lock poisoned"))
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        Ok(self
            .keys
            .iter()
            .find(|entry| entry.value().key_hash == key_hash)
            .map(|entry| entry.value().clone()))
    }

    async fn touch_last_used(&self, key_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut entry) = self.keys.get_mut(key_id) {
            entry.last_used = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn find(&self, target_id: &str) -> Result<Option<TargetApi>, StoreError> {
        Ok(self.targets.get(target_id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find(
        &self,
        principal: &str,
        target: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .get(&(principal.to_string(), target.to_string()))
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn append(&self, record: UsageRecord) -> Result<(), StoreError> {
        let mut log = self.usage.lock().map_err(|_| poisoned("usage log"))?;
        log.push(record);
        Ok(())
    }

    async fn count_since(
        &self,
        principal: &str,
        target: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let log = self.usage.lock().map_err(|_| poisoned("usage log"))?;
        Ok(log
            .iter()
            .filter(|r| r.principal == principal && r.target == target && r.timestamp >= since)
            .count() as u64)
    }
}

struct Window {
    count: u64,
    expires: Instant,
    reset_at: DateTime<Utc>,
}

impl Window {
    fn fresh(window_secs: u64) -> Self {
        Self {
            count: 0,
            expires: Instant::now() + Duration::from_secs(window_secs),
            reset_at: Utc::now() + chrono::Duration::seconds(window_secs as i64),
        }
    }
}

/// Fixed-window counters keyed by credential identifier.
#[derive(Default)]
pub struct MemoryCounterStore {
    windows: DashMap<String, Window>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, window_secs: u64) -> Result<WindowCount, StoreError> {
        // The entry guard holds the shard write lock for the whole
        // increment-then-read, so the operation is atomic per key.
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window::fresh(window_secs));
        if Instant::now() >= entry.expires {
            *entry = Window::fresh(window_secs);
        }
        entry.count += 1;
        Ok(WindowCount {
            count: entry.count,
            reset_at: entry.reset_at,
        })
    }
}
