use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::debug;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::extractors::bearer_token;
use crate::provider::KeySetProvider;
use crate::verifier::JwtVerifier;

/// Admit only callers whose verified claims grant `permission`.
pub fn ensure_permission(claims: &Claims, permission: &str) -> AuthResult<()> {
    if claims.has_permission(permission) {
        Ok(())
    } else {
        Err(AuthError::permission_denied(permission))
    }
}

/// Run the full gate: header, key set, token, permission.
///
/// The header is checked before any key material is requested, so
/// structurally invalid requests never trigger a JWKS fetch.
pub async fn authorize(
    headers: &HeaderMap,
    required_permission: &str,
    provider: &dyn KeySetProvider,
    verifier: &JwtVerifier,
) -> AuthResult<Claims> {
    let token = bearer_token(headers)?;
    let keys = provider.key_set().await?;
    let claims = verifier.verify(&token, &keys)?;
    ensure_permission(&claims, required_permission)?;
    Ok(claims)
}

/// Shared gate handle for the route layer.
#[derive(Clone)]
pub struct Authorizer {
    provider: Arc<dyn KeySetProvider>,
    verifier: JwtVerifier,
}

impl Authorizer {
    pub fn new(provider: Arc<dyn KeySetProvider>, verifier: JwtVerifier) -> Self {
        Self { provider, verifier }
    }

    pub fn verifier(&self) -> &JwtVerifier {
        &self.verifier
    }

    pub fn provider(&self) -> &Arc<dyn KeySetProvider> {
        &self.provider
    }

    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
    ) -> AuthResult<Claims> {
        let result = authorize(
            headers,
            required_permission,
            self.provider.as_ref(),
            &self.verifier,
        )
        .await;
        if let Err(err) = &result {
            debug!(
                code = err.kind().slug(),
                permission = required_permission,
                "authorization rejected"
            );
        }
        result
    }
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::error::AuthFailureKind;
    use crate::jwks::KeySet;
    use crate::provider::StaticKeySetProvider;
    use crate::testutil::{key_material, TokenBuilder, TEST_AUDIENCE, TEST_ISSUER};
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct UnavailableProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySetProvider for UnavailableProvider {
        async fn key_set(&self) -> AuthResult<Arc<KeySet>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AuthError::key_set_unavailable("HTTP 503 Service Unavailable"))
        }
    }

    fn authorizer() -> Authorizer {
        Authorizer::new(
            Arc::new(StaticKeySetProvider::new(key_material().key_set())),
            JwtVerifier::new(JwtConfig::new(TEST_ISSUER, TEST_AUDIENCE)),
        )
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        headers
    }

    #[tokio::test]
    async fn admits_caller_with_permission() {
        let token = TokenBuilder::new()
            .permissions(&["get:movies"])
            .sign(key_material());
        let claims = authorizer()
            .authorize(&bearer(&token), "get:movies")
            .await
            .expect("admitted");
        assert!(claims.has_permission("get:movies"));
    }

    #[tokio::test]
    async fn rejects_missing_permission_with_403() {
        let token = TokenBuilder::new()
            .permissions(&["get:movies"])
            .sign(key_material());
        let err = authorizer()
            .authorize(&bearer(&token), "delete:movies")
            .await
            .expect_err("denied");
        assert_eq!(err.kind(), AuthFailureKind::PermissionDenied);
        assert_eq!(err.status().as_u16(), 403);
    }

    #[tokio::test]
    async fn permission_match_is_case_sensitive() {
        let token = TokenBuilder::new()
            .permissions(&["GET:MOVIES"])
            .sign(key_material());
        let err = authorizer()
            .authorize(&bearer(&token), "get:movies")
            .await
            .expect_err("denied");
        assert_eq!(err.kind(), AuthFailureKind::PermissionDenied);
    }

    #[tokio::test]
    async fn header_is_checked_before_key_set_is_requested() {
        let provider = Arc::new(UnavailableProvider {
            calls: AtomicUsize::new(0),
        });
        let gate = Authorizer::new(
            provider.clone(),
            JwtVerifier::new(JwtConfig::new(TEST_ISSUER, TEST_AUDIENCE)),
        );

        let err = gate
            .authorize(&HeaderMap::new(), "get:movies")
            .await
            .expect_err("missing header");
        assert_eq!(err.kind(), AuthFailureKind::MissingOrMalformedHeader);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let err = gate
            .authorize(&bearer("abc.def.ghi"), "get:movies")
            .await
            .expect_err("no keys");
        assert_eq!(err.kind(), AuthFailureKind::KeySetUnavailable);
        assert_eq!(err.status().as_u16(), 500);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn verifier_failures_pass_through_unchanged() {
        let token = TokenBuilder::new()
            .issuer("https://wrong-domain/")
            .permissions(&["get:movies"])
            .sign(key_material());
        let err = authorizer()
            .authorize(&bearer(&token), "get:movies")
            .await
            .expect_err("wrong issuer");
        assert_eq!(err, AuthError::invalid_issuer());
    }

    #[test]
    fn ensure_permission_ignores_duplicates_and_order() {
        let token = TokenBuilder::new()
            .permissions(&["post:actors", "get:actors", "post:actors"])
            .sign(key_material());
        let claims = JwtVerifier::new(JwtConfig::new(TEST_ISSUER, TEST_AUDIENCE))
            .verify(&token, &key_material().key_set())
            .expect("claims");
        ensure_permission(&claims, "get:actors").expect("granted");
        ensure_permission(&claims, "post:actors").expect("granted");
        assert!(ensure_permission(&claims, "patch:actors").is_err());
    }
}
