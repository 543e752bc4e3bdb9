use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::is_rsa_family;
use crate::error::{AuthError, AuthResult};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a JWKS response body.
pub const MAX_JWKS_BYTES: usize = 256 * 1024;

/// One public key from the identity provider's key set.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Option<Algorithm>,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn new(kid: impl Into<String>, algorithm: Option<Algorithm>, decoding: DecodingKey) -> Self {
        Self {
            kid: kid.into(),
            algorithm,
            decoding,
        }
    }

    /// Build from base64url-encoded RSA modulus and exponent, as published in a JWKS.
    pub fn from_rsa_components(
        kid: impl Into<String>,
        algorithm: Option<Algorithm>,
        modulus: &str,
        exponent: &str,
    ) -> AuthResult<Self> {
        let kid = kid.into();
        let decoding = DecodingKey::from_rsa_components(modulus, exponent).map_err(|err| {
            AuthError::key_set_unavailable(format!("invalid RSA components for kid '{kid}': {err}"))
        })?;
        Ok(Self::new(kid, algorithm, decoding))
    }

    pub fn from_rsa_pem(kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        let kid = kid.into();
        let decoding = DecodingKey::from_rsa_pem(pem).map_err(|err| {
            AuthError::key_set_unavailable(format!("invalid RSA PEM for kid '{kid}': {err}"))
        })?;
        Ok(Self::new(kid, None, decoding))
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm the key is restricted to, when the key set declares one.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Immutable snapshot of signing keys indexed by key identifier.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, SigningKey>,
}

impl KeySet {
    /// Collect keys; the first key seen for a kid wins.
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = SigningKey>,
    {
        let mut map = HashMap::new();
        for key in keys {
            if map.contains_key(key.kid()) {
                warn!(kid = key.kid(), "duplicate kid in key set, keeping first");
                continue;
            }
            map.insert(key.kid.clone(), key);
        }
        Self { keys: map }
    }

    /// Parse a JWKS document. Unusable records are skipped; a document that
    /// yields no usable key is an error.
    pub fn from_jwks_json(body: &[u8]) -> AuthResult<Self> {
        let document: JwksDocument = serde_json::from_slice(body).map_err(|err| {
            AuthError::key_set_unavailable(format!("failed to parse JWKS response: {err}"))
        })?;

        let keys = document
            .keys
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<JwkEntry>(value) {
                Ok(entry) => entry.into_signing_key(),
                Err(err) => {
                    debug!(error = %err, "skipping unreadable JWKS record");
                    None
                }
            });
        let set = Self::from_keys(keys);

        if set.is_empty() {
            return Err(AuthError::key_set_unavailable(
                "JWKS response contained no usable RSA signing keys",
            ));
        }
        Ok(set)
    }

    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

impl JwkEntry {
    fn into_signing_key(self) -> Option<SigningKey> {
        let Some(kid) = self.kid else {
            debug!("skipping JWKS record without kid");
            return None;
        };
        if let Some(kty) = self.kty.as_deref() {
            if kty != "RSA" {
                debug!(kid, kty, "skipping non-RSA JWKS record");
                return None;
            }
        }
        if let Some(key_use) = self.key_use.as_deref() {
            if key_use != "sig" {
                debug!(kid, key_use, "skipping JWKS record not meant for signatures");
                return None;
            }
        }
        let algorithm = match self.alg.as_deref() {
            None => None,
            Some(alg) => match Algorithm::from_str(alg) {
                Ok(alg) if is_rsa_family(alg) => Some(alg),
                _ => {
                    debug!(kid, alg, "skipping JWKS record with unsupported alg");
                    return None;
                }
            },
        };
        let (Some(modulus), Some(exponent)) = (self.n, self.e) else {
            debug!(kid, "skipping JWKS record missing RSA components");
            return None;
        };

        match SigningKey::from_rsa_components(kid, algorithm, &modulus, &exponent) {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(error = %err, "skipping JWKS record");
                None
            }
        }
    }
}

/// Fetches the key set from a fixed JWKS URL.
#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
    timeout: Duration,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> AuthResult<KeySet> {
        let mut response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AuthError::key_set_unavailable(format!(
                        "timed out after {:?} fetching JWKS from {}",
                        self.timeout, self.url
                    ))
                } else {
                    AuthError::key_set_unavailable(format!("failed to fetch JWKS: {err}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::key_set_unavailable(format!(
                "HTTP {} from {}",
                status, self.url
            )));
        }

        let too_large = || {
            AuthError::key_set_unavailable(format!(
                "JWKS response from {} exceeds {MAX_JWKS_BYTES} bytes",
                self.url
            ))
        };
        if response
            .content_length()
            .is_some_and(|len| len > MAX_JWKS_BYTES as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|err| {
            AuthError::key_set_unavailable(format!("failed to read JWKS response: {err}"))
        })? {
            if body.len() + chunk.len() > MAX_JWKS_BYTES {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        KeySet::from_jwks_json(&body)
    }
}
