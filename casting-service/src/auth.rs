use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common_auth::{
    Authorizer, CachedKeySetProvider, JwksFetcher, JwtVerifier, KeySet, KeySetProvider,
    SigningKey, StaticKeySetProvider,
};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;

pub const DEV_KEY_ID: &str = "local-dev";

/// Authorizer plus the JWKS cache backing it, if any. The cache is handed
/// to [`spawn_jwks_refresh`]; a dev PEM setup has nothing to refresh.
pub struct AuthSetup {
    pub authorizer: Arc<Authorizer>,
    pub jwks_cache: Option<Arc<CachedKeySetProvider>>,
}

pub fn build_authorizer(config: &ServiceConfig) -> Result<AuthSetup> {
    let verifier = JwtVerifier::new(config.jwt_config());

    if let Some(pem) = &config.dev_public_key_pem {
        warn!("Using JWT_DEV_PUBLIC_KEY_PEM for verification; do not enable in production");
        let key = SigningKey::from_rsa_pem(DEV_KEY_ID, pem.as_bytes())?;
        let provider: Arc<dyn KeySetProvider> =
            Arc::new(StaticKeySetProvider::new(KeySet::from_keys([key])));
        return Ok(AuthSetup {
            authorizer: Arc::new(Authorizer::new(provider, verifier)),
            jwks_cache: None,
        });
    }

    let url = config.jwks_url();
    info!(jwks_url = %url, "Configuring JWKS fetcher");
    let fetcher = JwksFetcher::new(url).with_timeout(config.jwks_fetch_timeout);
    let cache = Arc::new(CachedKeySetProvider::with_ttl(fetcher, config.jwks_cache_ttl));
    let provider: Arc<dyn KeySetProvider> = cache.clone();

    Ok(AuthSetup {
        authorizer: Arc::new(Authorizer::new(provider, verifier)),
        jwks_cache: Some(cache),
    })
}

/// The first tick fires immediately, which warms the cache at startup.
pub fn spawn_jwks_refresh(cache: Arc<CachedKeySetProvider>, every: Duration) -> JoinHandle<()> {
    let url = cache.fetcher().url().to_owned();
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // failures are logged by the cache itself
            if let Ok(keys) = cache.refresh().await {
                debug!(count = keys.len(), jwks_url = %url, "Refreshed JWKS keys");
            }
        }
    })
}
