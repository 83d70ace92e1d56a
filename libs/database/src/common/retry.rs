use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::error::{DatabaseError, DatabaseResult};

/// How many times a connector tries, and how long it waits in between.
///
/// The wait starts at `initial_delay` and doubles after every failed
/// attempt, up to `max_delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Defaults: 3 attempts, 100ms initial delay, 5s max delay
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Run `connect` until it succeeds or `policy.attempts` have failed.
///
/// At least one attempt is always made. Exhausting the attempts returns
/// [`DatabaseError::ConnectionFailed`] wrapping the last error.
pub async fn connect_with_retry<F, Fut, T>(
    store: &'static str,
    policy: &RetryPolicy,
    mut connect: F,
) -> DatabaseResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DatabaseResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut delay = policy.initial_delay.min(policy.max_delay);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match connect().await {
            Ok(connection) => {
                if attempt > 1 {
                    debug!(store, attempt, "connected after retrying");
                }
                return Ok(connection);
            }
            Err(err) if attempt >= attempts => {
                error!(store, attempts, error = %err, "giving up on connection");
                return Err(DatabaseError::ConnectionFailed {
                    store,
                    attempts,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                warn!(store, attempt, attempts, error = %err, retry_in = ?delay, "connection attempt failed");
                tokio::time::sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}
