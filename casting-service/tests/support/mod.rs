#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use casting_service::app;
use casting_service::app_state::AppState;
use casting_service::store::CastingStore;
use common_auth::testutil::{key_material, TokenBuilder, TEST_AUDIENCE, TEST_ISSUER};
use common_auth::{
    Authorizer, JwtConfig, JwtVerifier, KeySetProvider, StaticKeySetProvider,
};
use serde_json::Value;
use tower::ServiceExt;

pub const ALL_PERMISSIONS: &[&str] = &[
    "get:movies",
    "post:movies",
    "patch:movies",
    "delete:movies",
    "get:actors",
    "post:actors",
    "patch:actors",
    "delete:actors",
];

pub fn app_with_provider(provider: Arc<dyn KeySetProvider>) -> Router {
    let verifier = JwtVerifier::new(JwtConfig::new(TEST_ISSUER, TEST_AUDIENCE));
    let authorizer = Arc::new(Authorizer::new(provider, verifier));
    app(AppState::new(Arc::new(CastingStore::new()), authorizer))
}

pub fn test_app() -> Router {
    let provider = Arc::new(StaticKeySetProvider::new(key_material().key_set()));
    app_with_provider(provider)
}

pub fn token_with(permissions: &[&str]) -> String {
    TokenBuilder::new().permissions(permissions).sign(key_material())
}

pub fn admin_token() -> String {
    token_with(ALL_PERMISSIONS)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub error_code: Option<String>,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    send_request(app, request).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let error_code = response
        .headers()
        .get("X-Error-Code")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    TestResponse { status, error_code, body }
}
