use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use aigw_core::PublicError;

/// Bridges `PublicError` (axum-free, in `aigw-core`) onto an axum response.
pub struct ErrorResponse(pub PublicError);

impl From<PublicError> for ErrorResponse {
    fn from(err: PublicError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_envelope())).into_response()
    }
}
