//! Axum HTTP surface over `aigw-core` (`spec.md` §6). No business logic
//! lives here — handlers parse/serialize and call straight into the pipeline
//! and job engine.

mod auth_middleware;
mod handlers;
mod response;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use aigw_core::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .route("/v1/responses", post(handlers::responses))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::list_models))
        .route("/v1/jobs", post(handlers::create_job))
        .route("/v1/jobs/{id}", get(handlers::get_job))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::require_api_key));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .merge(authenticated)
        .with_state(state)
}
