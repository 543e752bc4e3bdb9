use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Verified token claims. Only the verifier builds these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    issuer: String,
    audience: Vec<String>,
    subject: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    permissions: Vec<String>,
    raw: serde_json::Value,
}

impl Claims {
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// Decoded token body exactly as presented.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Exact, case-sensitive membership test.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|value| value == permission)
    }

    pub(crate) fn from_body(body: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(body.clone())
            .map_err(|err| AuthError::malformed_token(format!("malformed claim payload: {err}")))?;

        let expires_at = timestamp_from_number(&repr.exp)
            .ok_or_else(|| AuthError::malformed_token(format!("invalid exp claim '{}'", repr.exp)))?;

        // iat is informational; an unreadable value is dropped, not fatal
        let issued_at = match &repr.iat {
            Some(serde_json::Value::Number(iat)) => timestamp_from_number(iat),
            _ => None,
        };

        let audience = match repr.aud {
            AudienceRepr::Single(item) => vec![item],
            AudienceRepr::Many(items) => items,
        };

        Ok(Self {
            issuer: repr.iss,
            audience,
            subject: repr.sub,
            issued_at,
            expires_at,
            permissions: repr.permissions,
            raw: body,
        })
    }
}

/// NumericDate may carry a fraction; whole seconds are kept (floored).
fn timestamp_from_number(value: &serde_json::Number) -> Option<DateTime<Utc>> {
    let seconds = match value.as_i64() {
        Some(seconds) => seconds,
        None => {
            let seconds = value.as_f64()?.floor();
            if !seconds.is_finite() || seconds < i64::MIN as f64 || seconds >= i64::MAX as f64 {
                return None;
            }
            seconds as i64
        }
    };
    Utc.timestamp_opt(seconds, 0).single()
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    iss: String,
    aud: AudienceRepr,
    exp: serde_json::Number,
    permissions: Vec<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    iat: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}
