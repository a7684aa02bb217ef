//! Credential resolution.
//!
//! Presented credentials are hashed before they reach the store layer, so
//! lookups never compare against raw secret material. Deactivated and
//! expired keys fail resolution rather than silently passing.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::error::GatewayError;
use crate::store::{ApiKey, KeyStore};

/// Hex SHA-256 of a presented credential.
pub fn hash_credential(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Maps a presented credential to its ApiKey record and owning principal.
pub struct KeyResolver {
    keys: Arc<dyn KeyStore>,
}

impl KeyResolver {
    pub fn new(keys: Arc<dyn KeyStore>) -> Self {
        Self { keys }
    }

    /// Resolve a bearer credential to a usable key, or `Unauthorized`.
    ///
    /// On success, spawns a fire-and-forget last-used bump; the request is
    /// never blocked on that write.
    pub async fn resolve(&self, credential: &str) -> Result<ApiKey, GatewayError> {
        let hash = hash_credential(credential);
        let key = self
            .keys
            .find_by_hash(&hash)
            .await
            .map_err(|e| GatewayError::Internal(format!("key lookup failed: {e}")))?;

        let now = Utc::now();
        match key {
            Some(key) if key.is_usable(now) => {
                let store = Arc::clone(&self.keys);
                let key_id = key.id.clone();
                tokio::spawn(async move {
                    if let Err(e) = store.touch_last_used(&key_id, now).await {
                        tracing::warn!(key = %key_id, error = %e, "last-used touch failed");
                    }
                });
                Ok(key)
            }
            Some(key) => {
                tracing::debug!(key = %key.id, "credential matched an unusable key");
                Err(GatewayError::Unauthorized)
            }
            None => Err(GatewayError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn seeded_key(secret: &str, active: bool, expired: bool) -> ApiKey {
        ApiKey {
            id: "k1".into(),
            key_hash: hash_credential(secret),
            principal: "p1".into(),
            rate_limit: 100,
            active,
            expires_at: expired.then(|| Utc::now() - Duration::minutes(5)),
            last_used: None,
        }
    }

    #[test]
    fn hash_is_stable_hex_sha256() {
        let h = hash_credential("eph_secret");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_credential("eph_secret"));
        assert_ne!(h, hash_credential("eph_other"));
    }

    #[tokio::test]
    async fn resolves_active_key_and_bumps_last_used() {
        let store = Arc::new(MemoryStore::new());
        store.insert_key(seeded_key("secret", true, false));

        let resolver = KeyResolver::new(store.clone());
        let key = resolver.resolve("secret").await.unwrap();
        assert_eq!(key.id, "k1");
        assert_eq!(key.principal, "p1");

        // The touch is fire-and-forget; give the spawned task a beat.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let stored = store.find_by_hash(&key.key_hash).await.unwrap().unwrap();
        assert!(stored.last_used.is_some());
    }

    #[tokio::test]
    async fn unknown_credential_is_unauthorized() {
        let store = Arc::new(MemoryStore::new());
        let resolver = KeyResolver::new(store);
        assert!(matches!(
            resolver.resolve("nope").await,
            Err(GatewayError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn inactive_key_is_unauthorized() {
        let store = Arc::new(MemoryStore::new());
        store.insert_key(seeded_key("secret", false, false));
        let resolver = KeyResolver::new(store);
        assert!(matches!(
            resolver.resolve("secret").await,
            Err(GatewayError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn expired_key_is_unauthorized() {
        let store = Arc::new(MemoryStore::new());
        store.insert_key(seeded_key("secret", true, true));
        let resolver = KeyResolver::new(store);
        assert!(matches!(
            resolver.resolve("secret").await,
            Err(GatewayError::Unauthorized)
        ));
    }
}
