//! Casting agency API: movies and actors behind permission-scoped bearer tokens.

pub mod actor_handlers;
pub mod api_error;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod models;
pub mod movie_handlers;
pub mod permissions;
pub mod store;

use axum::http::{header, Method};
use axum::routing::{get, patch};
use axum::{middleware, Json, Router};
use common_http_errors::http_error_metrics_layer;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::actor_handlers::{create_actor, delete_actor, list_actors, update_actor};
use crate::api_error::method_not_allowed;
use crate::app_state::AppState;
use crate::metrics::render_metrics;
use crate::movie_handlers::{create_movie, delete_movie, list_movies, update_movie};

pub const SERVICE_NAME: &str = "casting-service";

async fn index() -> Json<Value> {
    Json(json!({ "success": 200 }))
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index).fallback(method_not_allowed))
        .route("/healthz", get(healthz).fallback(method_not_allowed))
        .route("/metrics", get(render_metrics).fallback(method_not_allowed))
        .route(
            "/movies",
            get(list_movies)
                .post(create_movie)
                .fallback(method_not_allowed),
        )
        .route(
            "/movies/:id",
            patch(update_movie)
                .delete(delete_movie)
                .fallback(method_not_allowed),
        )
        .route(
            "/actors",
            get(list_actors)
                .post(create_actor)
                .fallback(method_not_allowed),
        )
        .route(
            "/actors/:id",
            patch(update_actor)
                .delete(delete_actor)
                .fallback(method_not_allowed),
        )
        .with_state(state)
        .layer(middleware::from_fn(http_error_metrics_layer(SERVICE_NAME)))
        .layer(cors)
}
