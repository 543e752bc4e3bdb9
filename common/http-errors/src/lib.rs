use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};
use serde::Serialize;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Error codes beyond this many distinct values are counted under `other`.
pub const MAX_ERROR_CODES: usize = 40;
const OVERFLOW_CODE: &str = "other";

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, message: Option<String> },
    NotFound { code: &'static str },
    MethodNotAllowed,
    Unprocessable { code: &'static str, message: Option<String> },
    Internal { message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self { Self::Internal { message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str) -> Self { Self::BadRequest { code, message: None } }
    pub fn not_found(code: &'static str) -> Self { Self::NotFound { code } }
    pub fn unprocessable(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unprocessable { code, message: Some(message.into()) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error_code) = match self {
            ApiError::BadRequest { code, message } => (
                StatusCode::BAD_REQUEST,
                message.unwrap_or_else(|| "Bad request".into()),
                code,
            ),
            ApiError::NotFound { code } => (StatusCode::NOT_FOUND, "Resource not found".into(), code),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".into(),
                "method_not_allowed",
            ),
            ApiError::Unprocessable { code, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                message.unwrap_or_else(|| "Unprocessable".into()),
                code,
            ),
            ApiError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                message.unwrap_or_else(|| "Internal Server Error".into()),
                "internal_error",
            ),
        };
        let body = ErrorBody { success: false, error: status.as_u16(), message };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    )
    .expect("http_errors_total");
    let _ = prometheus::default_registry().register(Box::new(c.clone()));
    c
});

static ERROR_CODES_DISTINCT: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new("http_error_codes_distinct", "Distinct error codes seen as metric labels")
        .expect("http_error_codes_distinct");
    let _ = prometheus::default_registry().register(Box::new(g.clone()));
    g
});

static ERROR_CODE_OVERFLOW_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "http_error_code_overflow_total",
        "Error responses whose code was folded into the overflow label",
    )
    .expect("http_error_code_overflow_total");
    let _ = prometheus::default_registry().register(Box::new(c.clone()));
    c
});

static SEEN_CODES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Map a code to its metric label, capping label cardinality.
fn label_for(code: &str) -> String {
    let mut seen = SEEN_CODES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if seen.contains(code) {
        return code.to_string();
    }
    if seen.len() >= MAX_ERROR_CODES {
        ERROR_CODE_OVERFLOW_TOTAL.inc();
        return OVERFLOW_CODE.to_string();
    }
    seen.insert(code.to_string());
    ERROR_CODES_DISTINCT.set(seen.len() as i64);
    code.to_string()
}

/// Count an error response by service, `X-Error-Code` and status.
pub fn record_http_error(service: &str, resp: &Response) {
    let status = resp.status();
    if status.as_u16() < 400 {
        return;
    }
    let code = resp
        .headers()
        .get(ERROR_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let label = label_for(code);
    HTTP_ERRORS_TOTAL
        .with_label_values(&[service, label.as_str(), status.as_str()])
        .inc();
}

type MetricsFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Middleware for `axum::middleware::from_fn` that records every error response.
pub fn http_error_metrics_layer(
    service: &'static str,
) -> impl Fn(Request, Next) -> MetricsFuture + Clone + Send + Sync + 'static {
    move |req: Request, next: Next| -> MetricsFuture {
        Box::pin(async move {
            let resp = next.run(req).await;
            record_http_error(service, &resp);
            resp
        })
    }
}

#[cfg(feature = "test-helpers")]
pub mod test_helpers {
    pub fn simulate_error_code(code: &str) {
        let _ = super::label_for(code);
    }

    pub fn distinct_gauge() -> i64 {
        super::ERROR_CODES_DISTINCT.get()
    }

    pub fn overflow_count() -> u64 {
        super::ERROR_CODE_OVERFLOW_TOTAL.get()
    }
}
