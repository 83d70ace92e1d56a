use std::time::Duration;

/// Errors returned by the connectors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sea_orm::DbErr),

    #[cfg(feature = "valkey")]
    #[error("Valkey error: {0}")]
    Valkey(#[from] redis::RedisError),

    #[error("no connection within {0:?}")]
    Timeout(Duration),

    /// Every attempt failed; `last` is the error of the final one.
    #[error("failed {store} connection after {attempts} attempts: {last}")]
    ConnectionFailed {
        store: &'static str,
        attempts: u32,
        #[source]
        last: Box<DatabaseError>,
    },
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
