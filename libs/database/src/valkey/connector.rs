use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;
use validator::Validate;

use super::ValkeyConfig;
use crate::common::{DatabaseError, DatabaseResult, connect_with_retry};

/// Validate `config`, then connect and `PING`, retrying up to
/// `config.retries` times. Each attempt is bounded by `config.dial_timeout`.
///
/// The returned manager reconnects on its own after the first connection.
///
/// # Errors
/// - [`DatabaseError::InvalidConfig`] before any attempt if a field is missing.
/// - [`DatabaseError::Valkey`] if the connection URL is malformed.
/// - [`DatabaseError::ConnectionFailed`] once every attempt has failed.
pub async fn connect(config: &ValkeyConfig) -> DatabaseResult<ConnectionManager> {
    config.validate()?;

    let client = Client::open(config.url())?;
    let dial_timeout = config.dial_timeout;
    let manager = connect_with_retry("valkey", &config.retry_policy(), || {
        let client = client.clone();

        async move {
            let mut manager = tokio::time::timeout(dial_timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| DatabaseError::Timeout(dial_timeout))??;
            let _: String = redis::cmd("PING").query_async(&mut manager).await?;
            Ok::<_, DatabaseError>(manager)
        }
    })
    .await?;

    info!(
        address = %config.address(),
        database = config.database,
        "successful valkey connection"
    );
    Ok(manager)
}
