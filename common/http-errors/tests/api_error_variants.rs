use common_http_errors::ApiError;
use axum::body::to_bytes;
use axum::response::IntoResponse;
use axum::http::StatusCode;

#[test]
fn bad_request_variant() {
    let err = ApiError::BadRequest { code: "missing_fields", message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "missing_fields");
}

#[test]
fn not_found_variant() {
    let resp = ApiError::not_found("movie_not_found").into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "movie_not_found");
}

#[test]
fn method_not_allowed_variant() {
    let resp = ApiError::MethodNotAllowed.into_response();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "method_not_allowed");
}

#[test]
fn unprocessable_variant() {
    let resp = ApiError::unprocessable("duplicate_id", "id 3 already exists").into_response();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "duplicate_id");
}

#[test]
fn internal_variant() {
    let resp = ApiError::internal("boom").into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
}

#[tokio::test]
async fn body_shape_reports_status_and_message() {
    let resp = ApiError::not_found("actor_not_found").into_response();
    let bytes = to_bytes(resp.into_body(), 1024).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], 404);
    assert_eq!(body["message"], "Resource not found");
}
