//! Valkey connector (Redis protocol)

mod config;
mod connector;

pub use config::{DEFAULT_DIAL_TIMEOUT, DEFAULT_PORT, ValkeyConfig};
pub use connector::connect;

pub use redis::aio::ConnectionManager;
