use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::guards::Authorizer;
use crate::permission::Permission;

/// Pull the token out of an `Authorization: Bearer <token>` header.
///
/// The scheme is case-sensitive, separated by exactly one space, and the
/// token must be non-empty with no further whitespace.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<String> {
    let mut values = headers.get_all(AUTHORIZATION).iter();
    let value = values
        .next()
        .ok_or_else(|| AuthError::malformed_header("authorization header is expected"))?;
    if values.next().is_some() {
        return Err(AuthError::malformed_header(
            "multiple authorization headers are not allowed",
        ));
    }

    let raw = value
        .to_str()
        .map_err(|_| AuthError::malformed_header("authorization header is not valid ASCII"))?;
    let token = raw.strip_prefix("Bearer ").ok_or_else(|| {
        AuthError::malformed_header("authorization header must start with \"Bearer \"")
    })?;

    if token.is_empty() {
        return Err(AuthError::malformed_header("bearer token not found"));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(AuthError::malformed_header(
            "authorization header must be \"Bearer <token>\"",
        ));
    }

    Ok(token.to_owned())
}

/// Verified claims of a caller holding permission `P`.
///
/// Extracting this runs the gate before the handler body; on failure the
/// handler is never called and the `AuthError` becomes the response.
#[derive(Debug, Clone)]
pub struct Authorized<P: Permission> {
    claims: Claims,
    permission: PhantomData<P>,
}

impl<P: Permission> Authorized<P> {
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

#[async_trait]
impl<S, P> FromRequestParts<S> for Authorized<P>
where
    Arc<Authorizer>: FromRef<S>,
    S: Send + Sync,
    P: Permission,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authorizer = Arc::<Authorizer>::from_ref(state);
        let claims = authorizer.authorize(&parts.headers, P::NAME).await?;
        Ok(Self {
            claims,
            permission: PhantomData,
        })
    }
}
