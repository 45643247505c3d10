use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use aigw_core::AppState;

use crate::response::ErrorResponse;

/// Authenticates every request via `X-API-Key` and stashes the resolved
/// `AuthenticatedKey` in request extensions for handlers to pull out
/// (`spec.md` §6). Mirrors the teacher's `proxy_auth` shape, minus the
/// downstream-event capture this gateway has no equivalent of.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let presented = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ErrorResponse(aigw_core::PublicError::unauthorized()))?;

    let authenticated = state.authenticator.authenticate(&presented).await?;
    req.extensions_mut().insert(authenticated);
    Ok(next.run(req).await)
}
