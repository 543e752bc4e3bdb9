//! Key material and token minting for tests.
//!
//! Enabled for this crate's own tests and, through the `test-helpers`
//! feature, for downstream integration tests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Map, Value};

use crate::jwks::{KeySet, SigningKey};

pub const TEST_ISSUER: &str = "https://casting.test.auth0.com/";
pub const TEST_AUDIENCE: &str = "casting-agency";
pub const PRIMARY_KID: &str = "primary-key";
pub const SECOND_KID: &str = "second-key";

pub struct KeyMaterial {
    pub kid: &'static str,
    pub encoding: EncodingKey,
    pub modulus: String,
    pub exponent: String,
    pub public_pem: String,
}

impl KeyMaterial {
    fn generate(kid: &'static str) -> Self {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("private pem");
        let public_pem = public_key.to_pkcs1_pem(LineEnding::LF).expect("public pem");

        Self {
            kid,
            encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
            modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            public_pem,
        }
    }

    pub fn jwk(&self) -> Value {
        json!({
            "kid": self.kid,
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "n": self.modulus,
            "e": self.exponent,
        })
    }

    pub fn jwks_body(&self) -> Value {
        json!({ "keys": [self.jwk()] })
    }

    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_rsa_components(self.kid, Some(Algorithm::RS256), &self.modulus, &self.exponent)
            .expect("signing key")
    }

    pub fn key_set(&self) -> KeySet {
        KeySet::from_keys([self.signing_key()])
    }
}

static PRIMARY: Lazy<KeyMaterial> = Lazy::new(|| KeyMaterial::generate(PRIMARY_KID));
static SECOND: Lazy<KeyMaterial> = Lazy::new(|| KeyMaterial::generate(SECOND_KID));

/// Shared key; generated once per test binary.
pub fn key_material() -> &'static KeyMaterial {
    &PRIMARY
}

/// A distinct key that is not published in [`key_material`]'s key set.
pub fn other_key_material() -> &'static KeyMaterial {
    &SECOND
}

/// Builds signed tokens with sensible defaults: test issuer and audience,
/// RS256, expiring ten minutes from now.
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    kid: Option<String>,
    algorithm: Algorithm,
    claims: Map<String, Value>,
}

impl Default for TokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBuilder {
    pub fn new() -> Self {
        let now = Utc::now().timestamp();
        let mut claims = Map::new();
        claims.insert("iss".into(), TEST_ISSUER.into());
        claims.insert("sub".into(), "auth0|casting-director".into());
        claims.insert("aud".into(), TEST_AUDIENCE.into());
        claims.insert("iat".into(), now.into());
        claims.insert("exp".into(), (now + 600).into());
        claims.insert("permissions".into(), json!([]));
        Self {
            kid: None,
            algorithm: Algorithm::RS256,
            claims,
        }
    }

    pub fn permissions(self, permissions: &[&str]) -> Self {
        self.claim("permissions", json!(permissions))
    }

    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", issuer)
    }

    pub fn audience(self, audience: impl Into<Value>) -> Self {
        self.claim("aud", audience)
    }

    pub fn expires_at(self, exp: i64) -> Self {
        self.claim("exp", exp)
    }

    pub fn claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Override the header kid; defaults to the signing key's kid.
    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn body(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    pub fn sign(&self, material: &KeyMaterial) -> String {
        let mut header = Header::new(self.algorithm);
        header.kid = Some(self.kid.clone().unwrap_or_else(|| material.kid.to_string()));
        encode(&header, &self.body(), &material.encoding).expect("sign token")
    }

    /// Sign with an explicit header, e.g. one without a kid.
    pub fn sign_with_header(&self, header: &Header, material: &KeyMaterial) -> String {
        encode(header, &self.body(), &material.encoding).expect("sign token")
    }
}

/// Replace one character in the middle of the signature segment with a
/// different base64url character.
pub fn tamper_signature(token: &str) -> String {
    let (prefix, signature) = token.rsplit_once('.').expect("three segments");
    let mut chars: Vec<char> = signature.chars().collect();
    let idx = chars.len() / 2;
    chars[idx] = if chars[idx] == 'A' { 'B' } else { 'A' };
    format!("{prefix}.{}", chars.into_iter().collect::<String>())
}

/// Assemble a token from raw JSON parts with an arbitrary signature.
pub fn unsigned_token(header: &Value, body: &Value, signature: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(body.to_string()),
        signature
    )
}
