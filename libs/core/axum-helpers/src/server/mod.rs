//! Server infrastructure module.
//!
//! This module provides:
//! - Router setup under a base path with status endpoints
//! - Lifecycle-managed serving with bounded graceful drain
//! - Connection-level read, write and idle timeouts
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_app, create_router};
//! use core_config::{app_info, server::ServerConfig};
//! use lifecycle::{LifecycleHandle, TerminationSource};
//!
//! let config = ServerConfig::default();
//! let router = create_router(&config.base_path, app_info!(), api_routes);
//!
//! let termination = TerminationSource::install(&LifecycleHandle::new())?;
//! create_app(router, &config, termination.handle()).await?;
//! ```

pub mod app;
mod connection;
pub mod health;

// Re-export commonly used types and functions
pub use app::{HttpServer, HttpTimeouts, create_app, create_router, run_http_server};
pub use health::{HealthResponse, health_handler, status_router, version_handler};
