use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use common_auth::Authorized;
use common_http_errors::{ApiError, ApiResult};
use serde_json::{json, Value};
use tracing::info;

use crate::api_error::{json_body, path_id};
use crate::app_state::AppState;
use crate::models::{release_date_in_range, MoviePatch, NewMovie};
use crate::permissions::{DeleteMovies, GetMovies, PatchMovies, PostMovies};

fn check_release_date(secs: i64) -> ApiResult<()> {
    if release_date_in_range(secs) {
        Ok(())
    } else {
        Err(ApiError::BadRequest {
            code: "invalid_release_date",
            message: Some(format!("release_date {secs} is out of range")),
        })
    }
}

pub async fn list_movies(
    State(state): State<AppState>,
    _auth: Authorized<GetMovies>,
) -> Json<Value> {
    Json(json!({
        "success": true,
        "movies": state.store.movies.list(),
    }))
}

pub async fn create_movie(
    State(state): State<AppState>,
    _auth: Authorized<PostMovies>,
    body: Result<Json<NewMovie>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let movie = json_body(body)?
        .into_movie()
        .ok_or(ApiError::bad_request("missing_fields"))?;
    check_release_date(movie.release_date)?;
    let id = movie.id;
    state.store.add_movie(movie)?;
    info!(movie_id = id, "movie created");

    let movies = state.store.movies.list();
    Ok(Json(json!({
        "success": true,
        "total_movies": movies.len(),
        "movies": movies,
    })))
}

pub async fn update_movie(
    State(state): State<AppState>,
    _auth: Authorized<PatchMovies>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<MoviePatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(path)?;
    let patch = json_body(body)?;
    if patch.is_empty() {
        return Err(ApiError::bad_request("missing_fields"));
    }
    if let Some(release_date) = patch.release_date {
        check_release_date(release_date)?;
    }

    let movie = state.store.movies.update(id, |movie| patch.apply(movie))?;
    info!(movie_id = id, "movie updated");
    Ok(Json(json!({ "success": true, "movie": movie })))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    _auth: Authorized<DeleteMovies>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(path)?;
    state.store.movies.remove(id)?;
    info!(movie_id = id, "movie deleted");
    Ok(Json(json!({ "success": true, "id": id })))
}
