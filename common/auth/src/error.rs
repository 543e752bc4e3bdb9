use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Header carrying the failure slug so middleware can count failures without
/// parsing the body.
pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Why a request could not be authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureKind {
    MissingOrMalformedHeader,
    MalformedToken,
    UnknownSigningKey,
    InvalidSignature,
    InvalidIssuer,
    InvalidAudience,
    TokenExpired,
    PermissionDenied,
    KeySetUnavailable,
}

impl AuthFailureKind {
    pub const ALL: [AuthFailureKind; 9] = [
        AuthFailureKind::MissingOrMalformedHeader,
        AuthFailureKind::MalformedToken,
        AuthFailureKind::UnknownSigningKey,
        AuthFailureKind::InvalidSignature,
        AuthFailureKind::InvalidIssuer,
        AuthFailureKind::InvalidAudience,
        AuthFailureKind::TokenExpired,
        AuthFailureKind::PermissionDenied,
        AuthFailureKind::KeySetUnavailable,
    ];

    /// Stable machine-readable identifier returned to clients as `code`.
    pub fn slug(&self) -> &'static str {
        match self {
            AuthFailureKind::MissingOrMalformedHeader => "missing_or_malformed_header",
            AuthFailureKind::MalformedToken => "malformed_token",
            AuthFailureKind::UnknownSigningKey => "unknown_signing_key",
            AuthFailureKind::InvalidSignature => "invalid_signature",
            AuthFailureKind::InvalidIssuer => "invalid_issuer",
            AuthFailureKind::InvalidAudience => "invalid_audience",
            AuthFailureKind::TokenExpired => "token_expired",
            AuthFailureKind::PermissionDenied => "permission_denied",
            AuthFailureKind::KeySetUnavailable => "key_set_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthFailureKind::PermissionDenied => StatusCode::FORBIDDEN,
            AuthFailureKind::KeySetUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}")]
pub struct AuthError {
    kind: AuthFailureKind,
    description: String,
}

impl AuthError {
    pub fn new(kind: AuthFailureKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn kind(&self) -> AuthFailureKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn malformed_header(description: impl Into<String>) -> Self {
        Self::new(AuthFailureKind::MissingOrMalformedHeader, description)
    }

    pub fn malformed_token(description: impl Into<String>) -> Self {
        Self::new(AuthFailureKind::MalformedToken, description)
    }

    pub fn unknown_key(kid: &str) -> Self {
        Self::new(
            AuthFailureKind::UnknownSigningKey,
            format!("no signing key registered for kid '{kid}'"),
        )
    }

    pub fn invalid_signature() -> Self {
        Self::new(
            AuthFailureKind::InvalidSignature,
            "token signature could not be verified",
        )
    }

    pub fn invalid_issuer() -> Self {
        Self::new(
            AuthFailureKind::InvalidIssuer,
            "incorrect claims, please check the issuer",
        )
    }

    pub fn invalid_audience() -> Self {
        Self::new(
            AuthFailureKind::InvalidAudience,
            "incorrect claims, please check the audience",
        )
    }

    pub fn token_expired() -> Self {
        Self::new(AuthFailureKind::TokenExpired, "token expired")
    }

    pub fn permission_denied(permission: &str) -> Self {
        Self::new(
            AuthFailureKind::PermissionDenied,
            format!("permission '{permission}' not granted"),
        )
    }

    pub fn key_set_unavailable(description: impl Into<String>) -> Self {
        Self::new(AuthFailureKind::KeySetUnavailable, description)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    description: &'a str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = self.kind.slug();
        let body = ErrorBody {
            code,
            description: &self.description,
        };
        let mut resp = (self.status(), Json(body)).into_response();
        resp.headers_mut()
            .insert(ERROR_CODE_HEADER, HeaderValue::from_static(code));
        resp
    }
}
