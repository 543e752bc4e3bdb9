//! Bearer-token authentication and permission checks for the casting API.
//!
//! Keys come from the identity provider's JWKS endpoint ([`jwks`],
//! [`provider`]), tokens are checked by [`JwtVerifier`], and routes are
//! gated per permission by [`Authorizer`] / [`Authorized`].

pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod jwks;
pub mod permission;
pub mod provider;
pub mod verifier;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testutil;

pub use claims::Claims;
pub use config::{issuer_for_domain, jwks_url_for_domain, JwtConfig, RSA_ALGORITHMS};
pub use error::{AuthError, AuthFailureKind, AuthResult, ERROR_CODE_HEADER};
pub use extractors::{bearer_token, Authorized};
pub use guards::{authorize, ensure_permission, Authorizer};
pub use jwks::{JwksFetcher, KeySet, SigningKey};
pub use permission::Permission;
pub use provider::{CachedKeySetProvider, KeySetProvider, StaticKeySetProvider};
pub use verifier::JwtVerifier;

pub use jsonwebtoken::Algorithm;
