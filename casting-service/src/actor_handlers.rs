use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use common_auth::Authorized;
use common_http_errors::{ApiError, ApiResult};
use serde_json::{json, Value};
use tracing::info;

use crate::api_error::{json_body, path_id};
use crate::app_state::AppState;
use crate::models::{ActorPatch, NewActor};
use crate::permissions::{DeleteActors, GetActors, PatchActors, PostActors};

pub async fn list_actors(
    State(state): State<AppState>,
    _auth: Authorized<GetActors>,
) -> Json<Value> {
    Json(json!({
        "success": true,
        "actors": state.store.actors.list(),
    }))
}

pub async fn create_actor(
    State(state): State<AppState>,
    _auth: Authorized<PostActors>,
    body: Result<Json<NewActor>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let actor = json_body(body)?
        .into_actor()
        .ok_or(ApiError::bad_request("missing_fields"))?;
    let id = actor.id;
    state.store.add_actor(actor)?;
    info!(actor_id = id, "actor created");

    let actors = state.store.actors.list();
    Ok(Json(json!({
        "success": true,
        "total_actors": actors.len(),
        "actors": actors,
    })))
}

pub async fn update_actor(
    State(state): State<AppState>,
    _auth: Authorized<PatchActors>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ActorPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(path)?;
    let patch = json_body(body)?;
    if patch.is_empty() {
        return Err(ApiError::bad_request("missing_fields"));
    }

    let actor = state.store.actors.update(id, |actor| patch.apply(actor))?;
    info!(actor_id = id, "actor updated");
    Ok(Json(json!({ "success": true, "actor": actor })))
}

pub async fn delete_actor(
    State(state): State<AppState>,
    _auth: Authorized<DeleteActors>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(path)?;
    state.store.actors.remove(id)?;
    info!(actor_id = id, "actor deleted");
    Ok(Json(json!({ "success": true, "id": id })))
}
