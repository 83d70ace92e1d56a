//! PostgreSQL connector

mod config;
mod connector;

pub use config::{DEFAULT_CONNECT_TIMEOUT, PostgresConfig};
pub use connector::connect;

pub use sea_orm::DatabaseConnection;
