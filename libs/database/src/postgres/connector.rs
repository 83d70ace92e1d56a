use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;
use validator::Validate;

use super::PostgresConfig;
use crate::common::{DatabaseError, DatabaseResult, connect_with_retry};

/// Validate `config`, then connect and ping, retrying up to `config.retries`
/// times.
///
/// # Errors
/// - [`DatabaseError::InvalidConfig`] before any attempt if a field is missing.
/// - [`DatabaseError::ConnectionFailed`] once every attempt has failed.
///
/// # Example
/// ```ignore
/// use database::postgres::{PostgresConfig, connect};
///
/// let config = PostgresConfig::new("localhost:5432", "app", "secret", "orders");
/// let db = connect(&config).await?;
/// ```
pub async fn connect(config: &PostgresConfig) -> DatabaseResult<DatabaseConnection> {
    config.validate()?;

    let url = config.url();
    let db = connect_with_retry("postgres", &config.retry_policy(), || {
        let mut options = ConnectOptions::new(url.clone());
        options
            .connect_timeout(config.connect_timeout)
            .acquire_timeout(config.connect_timeout)
            .sqlx_logging(false);

        async move {
            let db = Database::connect(options).await?;
            db.ping().await?;
            Ok::<_, DatabaseError>(db)
        }
    })
    .await?;

    info!(target = %config.target(), "successful postgres connection");
    Ok(db)
}
