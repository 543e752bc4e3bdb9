use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Json};
use common_http_errors::ApiError;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::store::StoreError;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::not_found("resource_not_found"),
            StoreError::Duplicate(id) => {
                ApiError::unprocessable("duplicate_id", format!("id {id} already exists"))
            }
        }
    }
}

/// Ids that do not parse are treated like unknown ids.
pub fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            debug!(error = %rejection, "rejected path id");
            Err(ApiError::not_found("resource_not_found"))
        }
    }
}

pub fn json_body<T: DeserializeOwned>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::BadRequest {
            code: "invalid_body",
            message: Some(rejection.body_text()),
        }),
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
