use crate::response::write_json;
use axum::{Router, extract::State, http::StatusCode, response::Response, routing::get};
use core_config::AppInfo;
use serde::Serialize;

pub const HEALTH_PATH: &str = "/__health__";
pub const VERSION_PATH: &str = "/__version__";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness endpoint handler.
///
/// Always `200 {"status":"ok"}` while the process is serving.
pub async fn health_handler() -> Response {
    write_json(StatusCode::OK, &HealthResponse { status: "ok" })
}

/// Build information endpoint handler.
///
/// Returns `{"committish": ..., "build_date": ...}` from the `AppInfo`
/// captured at compile time.
pub async fn version_handler(State(app): State<AppInfo>) -> Response {
    write_json(StatusCode::OK, &app.version())
}

/// Creates a router with the `__health__` and `__version__` endpoints.
///
/// # Example
/// ```ignore
/// use axum_helpers::server::status_router;
/// use core_config::app_info;
///
/// let app = Router::new().merge(status_router(app_info!()));
/// ```
pub fn status_router(app_info: AppInfo) -> Router {
    Router::new()
        .route(VERSION_PATH, get(version_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(app_info)
}
