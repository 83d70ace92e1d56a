use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::ErrorResponse;

/// Handler for 404 Not Found errors.
///
/// This can be used as a fallback handler in your router.
pub async fn not_found() -> Response {
    ErrorResponse::new(StatusCode::NOT_FOUND, "not found").into_response()
}

/// Handler for 405 Method Not Allowed errors.
pub async fn method_not_allowed() -> Response {
    ErrorResponse::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed").into_response()
}
