use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use aigw_common::RequestKind;
use aigw_core::auth::AuthenticatedKey;
use aigw_core::job_engine::{self, CreateJobRequest};
use aigw_core::pipeline::{resolve_provider_name, run_models_call, run_sync_call};
use aigw_core::AppState;

use crate::response::ErrorResponse;

fn provider_override(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-provider").and_then(|v| v.to_str().ok())
}

pub async fn responses(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedKey>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Response, ErrorResponse> {
    let provider = resolve_provider_name(provider_override(&headers), &state.default_provider);
    let result = run_sync_call(&state, &auth, RequestKind::Responses, &provider, payload).await?;
    Ok(Json(result.body).into_response())
}

pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedKey>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Response, ErrorResponse> {
    let provider = resolve_provider_name(provider_override(&headers), &state.default_provider);
    let result = run_sync_call(&state, &auth, RequestKind::ChatCompletions, &provider, payload).await?;
    Ok(Json(result.body).into_response())
}

pub async fn list_models(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedKey>,
    headers: HeaderMap,
) -> Result<Response, ErrorResponse> {
    let provider = resolve_provider_name(provider_override(&headers), &state.default_provider);
    let result = run_models_call(&state, &auth, &provider, None).await?;
    Ok(Json(result.body).into_response())
}

pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedKey>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Response, ErrorResponse> {
    let response = job_engine::create_job(&state, &auth, request).await?;
    Ok(Json(response).into_response())
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthenticatedKey>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, ErrorResponse> {
    let job = job_engine::get_job(&state, &auth, job_id).await?;
    Ok(Json(serde_json::json!({
        "job_id": job.id,
        "kind": job.kind,
        "provider": job.provider,
        "model": job.model,
        "status": job.status,
        "error_code": job.error_code,
        "error_message": job.error_message,
        "result": job.redacted_result,
        "webhook_url": job.webhook_url,
        "created_at": job.created_at,
        "updated_at": job.updated_at,
    }))
    .into_response())
}

pub async fn healthz() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness checks both connections the gateway depends on: a storage round
/// trip against the `api_keys` table stands in for "DB connection
/// established", and `RateLimiter::ping` for "Redis connection established"
/// (`SPEC_FULL.md` §6).
pub async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    use aigw_storage::Storage;
    let db_ok = state.storage.list_active_legacy_keys().await.is_ok();
    let redis_ok = state.rate_limiter.ping().await.is_ok();
    if db_ok && redis_ok {
        Json(serde_json::json!({ "status": "ready" })).into_response()
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "not_ready" })),
        )
            .into_response()
    }
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode_text(),
    )
}
