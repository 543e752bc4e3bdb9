use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{crypto, decode_header};
use tracing::debug;

use crate::claims::Claims;
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::KeySet;

/// Verifies bearer tokens against a supplied key set.
///
/// Checks run in a fixed order and the first failing check decides the
/// error: shape, header, key lookup, signature, claims, issuer, audience,
/// expiry. No I/O happens here.
#[derive(Debug, Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
}

impl JwtVerifier {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn verify(&self, token: &str, keys: &KeySet) -> AuthResult<Claims> {
        self.verify_at(token, keys, Utc::now())
    }

    pub fn verify_at(&self, token: &str, keys: &KeySet, now: DateTime<Utc>) -> AuthResult<Claims> {
        let segments = Segments::split(token)?;

        let header = decode_header(token)
            .map_err(|err| AuthError::malformed_token(format!("failed to decode token header: {err}")))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::malformed_token("token header missing kid"))?;
        if !self.config.accepts(header.alg) {
            return Err(AuthError::malformed_token(format!(
                "unsupported token algorithm {:?}",
                header.alg
            )));
        }

        let key = keys.get(&kid).ok_or_else(|| AuthError::unknown_key(&kid))?;

        if key.algorithm().is_some_and(|alg| alg != header.alg) {
            return Err(AuthError::invalid_signature());
        }
        match crypto::verify(
            segments.signature,
            segments.message.as_bytes(),
            key.decoding_key(),
            header.alg,
        ) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Err(AuthError::invalid_signature()),
        }

        let body = URL_SAFE_NO_PAD
            .decode(segments.body)
            .map_err(|err| AuthError::malformed_token(format!("token body is not base64url: {err}")))?;
        let body: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|err| AuthError::malformed_token(format!("token body is not JSON: {err}")))?;
        let claims = Claims::from_body(body)?;

        if claims.issuer() != self.config.issuer {
            return Err(AuthError::invalid_issuer());
        }

        if !claims
            .audience()
            .iter()
            .any(|aud| *aud == self.config.audience)
        {
            return Err(AuthError::invalid_audience());
        }

        let leeway = Duration::seconds(i64::from(self.config.leeway_seconds));
        if let Some(deadline) = claims.expires_at().checked_add_signed(leeway) {
            if now >= deadline {
                return Err(AuthError::token_expired());
            }
        }

        debug!(kid, "verified JWT successfully");
        Ok(claims)
    }
}

struct Segments<'a> {
    /// `header.body`, the signed input.
    message: &'a str,
    body: &'a str,
    signature: &'a str,
}

impl<'a> Segments<'a> {
    fn split(token: &'a str) -> AuthResult<Self> {
        if token.is_empty() {
            return Err(AuthError::malformed_token("token is empty"));
        }

        let parts: Vec<&'a str> = token.split('.').collect();
        let (header, body, signature) = match parts.as_slice() {
            [header, body, signature] => (*header, *body, *signature),
            _ => {
                return Err(AuthError::malformed_token(format!(
                    "expected 3 token segments, found {}",
                    parts.len()
                )))
            }
        };

        for segment in [header, body, signature] {
            if !is_base64url(segment) {
                return Err(AuthError::malformed_token(
                    "token segments must be non-empty base64url",
                ));
            }
        }

        Ok(Self {
            message: &token[..header.len() + 1 + body.len()],
            body,
            signature,
        })
    }
}

fn is_base64url(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() % 4 != 1
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
