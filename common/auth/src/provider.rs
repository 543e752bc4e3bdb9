use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AuthResult;
use crate::jwks::{JwksFetcher, KeySet};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Source of the current signing key set.
#[async_trait]
pub trait KeySetProvider: Send + Sync {
    /// Current key set; fails with `KeySetUnavailable` when it cannot be obtained.
    async fn key_set(&self) -> AuthResult<Arc<KeySet>>;
}

/// Naive provider: one network round trip per call.
#[async_trait]
impl KeySetProvider for JwksFetcher {
    async fn key_set(&self) -> AuthResult<Arc<KeySet>> {
        self.fetch().await.map(Arc::new)
    }
}

/// Fixed key set, e.g. a development PEM key.
#[derive(Debug, Clone)]
pub struct StaticKeySetProvider {
    keys: Arc<KeySet>,
}

impl StaticKeySetProvider {
    pub fn new(keys: KeySet) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }
}

#[async_trait]
impl KeySetProvider for StaticKeySetProvider {
    async fn key_set(&self) -> AuthResult<Arc<KeySet>> {
        Ok(self.keys.clone())
    }
}

struct CachedEntry {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// Serves a fetched key set until it is older than the TTL, then refetches.
///
/// The whole `Arc<KeySet>` is swapped under the write lock; readers hold
/// their own `Arc` and never see a partially updated set. A failed fetch
/// leaves the previous entry untouched but still fails the caller.
pub struct CachedKeySetProvider {
    fetcher: JwksFetcher,
    ttl: Duration,
    entry: RwLock<Option<CachedEntry>>,
}

impl CachedKeySetProvider {
    pub fn new(fetcher: JwksFetcher) -> Self {
        Self::with_ttl(fetcher, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(fetcher: JwksFetcher, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub fn fetcher(&self) -> &JwksFetcher {
        &self.fetcher
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached key set if present and younger than the TTL.
    pub fn cached(&self) -> Option<Arc<KeySet>> {
        let guard = self.entry.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.keys.clone())
    }

    /// Fetch unconditionally and replace the cached set on success.
    pub async fn refresh(&self) -> AuthResult<Arc<KeySet>> {
        let keys = match self.fetcher.fetch().await {
            Ok(keys) => Arc::new(keys),
            Err(err) => {
                warn!(error = %err, jwks_url = %self.fetcher.url(), "failed to fetch JWKS");
                return Err(err);
            }
        };

        let mut guard = self.entry.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(CachedEntry {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        debug!(count = keys.len(), jwks_url = %self.fetcher.url(), "refreshed JWKS keys");
        Ok(keys)
    }

    pub fn invalidate(&self) {
        let mut guard = self.entry.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }
}

#[async_trait]
impl KeySetProvider for CachedKeySetProvider {
    async fn key_set(&self) -> AuthResult<Arc<KeySet>> {
        if let Some(keys) = self.cached() {
            return Ok(keys);
        }
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthFailureKind;
    use crate::testutil::{key_material, other_key_material};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn fresh_entry_is_served_without_refetch() {
        let material = key_material();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(200).body(material.jwks_body().to_string());
            })
            .await;

        let provider = CachedKeySetProvider::new(JwksFetcher::new(server.url("/jwks")));
        let first = provider.key_set().await.expect("first fetch");
        let second = provider.key_set().await.expect("cached");

        assert!(Arc::ptr_eq(&first, &second));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn expired_entry_is_replaced_whole() {
        let first_material = key_material();
        let second_material = other_key_material();
        let server = MockServer::start_async().await;
        let mut mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(200).body(first_material.jwks_body().to_string());
            })
            .await;

        let provider =
            CachedKeySetProvider::with_ttl(JwksFetcher::new(server.url("/jwks")), Duration::ZERO);
        let first = provider.key_set().await.expect("first fetch");
        assert!(first.contains(first_material.kid));

        mock.delete_async().await;
        mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(200).body(second_material.jwks_body().to_string());
            })
            .await;

        let second = provider.key_set().await.expect("second fetch");
        mock.assert_hits_async(1).await;
        assert!(second.contains(second_material.kid));
        assert!(!second.contains(first_material.kid));
        // Earlier readers keep their own snapshot.
        assert!(first.contains(first_material.kid));
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(200).body(json!({ "keys": [] }).to_string());
            })
            .await;

        let provider = CachedKeySetProvider::new(JwksFetcher::new(server.url("/jwks")));
        for _ in 0..2 {
            let err = provider.key_set().await.expect_err("empty key set");
            assert_eq!(err.kind(), AuthFailureKind::KeySetUnavailable);
        }
        assert!(provider.cached().is_none());
        mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let material = key_material();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(200).body(material.jwks_body().to_string());
            })
            .await;

        let provider = CachedKeySetProvider::new(JwksFetcher::new(server.url("/jwks")));
        provider.key_set().await.expect("fetch");
        provider.invalidate();
        assert!(provider.cached().is_none());
        provider.key_set().await.expect("refetch");
        mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn static_provider_returns_same_snapshot() {
        let provider = StaticKeySetProvider::new(key_material().key_set());
        let a = provider.key_set().await.expect("keys");
        let b = provider.key_set().await.expect("keys");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
