//! # Axum Helpers
//!
//! Helpers for serving Axum applications under the [`lifecycle`] rules:
//! bind first, serve until cancelled, drain in-flight requests within a bound.
//!
//! ## Modules
//!
//! - **[`server`]**: HTTP runner, router setup, status endpoints
//! - **[`errors`]**: JSON error bodies and request rejections
//! - **[`extractors`]**: Validated JSON extractor
//! - **[`response`]**: JSON response writing
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::server::{create_app, create_router};
//! use core_config::{app_info, server::ServerConfig};
//! use lifecycle::LifecycleHandle;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let router = create_router(&config.base_path, app_info!(), Router::new());
//!
//!     let root = LifecycleHandle::new();
//!     create_app(router, &config, &root).await?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod extractors;
pub mod response;
pub mod server;

// Re-export server types
pub use server::{
    HealthResponse, HttpServer, HttpTimeouts, create_app, create_router, health_handler,
    run_http_server, status_router, version_handler,
};

// Re-export error types
pub use errors::{ErrorResponse, JsonError};

// Re-export extractors
pub use extractors::ValidatedJson;

pub use response::{JsonResponse, write_json};
