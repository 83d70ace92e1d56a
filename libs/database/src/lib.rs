//! Datastore connection constructors.
//!
//! Each connector validates its configuration, then tries to open and ping
//! a connection a bounded number of times before giving up.
//!
//! # Features
//!
//! - `postgres` (default) - PostgreSQL through SeaORM
//! - `valkey` (default) - Valkey (or any Redis-protocol server)
//!
//! # Example
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::{postgres::PostgresConfig, valkey::ValkeyConfig};
//!
//! let db = database::postgres::connect(&PostgresConfig::from_env()?).await?;
//! let cache = database::valkey::connect(&ValkeyConfig::from_env()?).await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "valkey")]
pub mod valkey;

pub use common::{DatabaseError, DatabaseResult, RetryPolicy};
