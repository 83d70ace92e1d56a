use core_config::{ConfigError, FromEnv, env_duration, env_or_default, env_required};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::common::RetryPolicy;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_RETRIES: u32 = 3;

/// Valkey connection settings.
#[derive(Clone, Debug, Validate)]
pub struct ValkeyConfig {
    #[validate(length(min = 1, message = "host is required"))]
    pub host: String,
    #[validate(range(min = 1, message = "port is required"))]
    pub port: u16,
    /// Logical database selected after connecting
    pub database: u8,
    /// How many times to try connecting before giving up
    #[validate(range(min = 1, message = "at least one attempt is required"))]
    pub retries: u32,
    /// Bound on a single attempt
    pub dial_timeout: Duration,
}

impl Default for ValkeyConfig {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

impl ValkeyConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            database: 0,
            retries: DEFAULT_RETRIES,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// `host:port`, with IPv6 hosts bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn url(&self) -> String {
        format!("redis://{}/{}", self.address(), self.database)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_attempts(self.retries)
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + ToString,
    T::Err: std::fmt::Display,
{
    env_or_default(key, &default.to_string())
        .parse()
        .map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: format!("{}", e),
        })
}

impl FromEnv for ValkeyConfig {
    /// Reads:
    /// - `VALKEY_HOST` (required)
    /// - `VALKEY_PORT` (default: 6379)
    /// - `VALKEY_DATABASE` (default: 0)
    /// - `VALKEY_RETRIES` (default: 3)
    /// - `VALKEY_DIAL_TIMEOUT` (default: 15s)
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_required("VALKEY_HOST")?,
            port: env_parse("VALKEY_PORT", DEFAULT_PORT)?,
            database: env_parse("VALKEY_DATABASE", 0)?,
            retries: env_parse("VALKEY_RETRIES", DEFAULT_RETRIES)?,
            dial_timeout: env_duration("VALKEY_DIAL_TIMEOUT", DEFAULT_DIAL_TIMEOUT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValkeyConfig::default();
        assert_eq!(config.url(), "redis://127.0.0.1:6379/0");
        assert_eq!(config.retry_policy().attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let config = ValkeyConfig::new("::1").with_database(2);
        assert_eq!(config.address(), "[::1]:6379");
        assert_eq!(config.url(), "redis://[::1]:6379/2");
    }

    #[test]
    fn test_validation_rejects_empty_host_and_port() {
        let errors = ValkeyConfig::new("")
            .with_port(0)
            .with_retries(0)
            .validate()
            .unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("host"));
        assert!(fields.contains_key("port"));
        assert!(fields.contains_key("retries"));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("VALKEY_HOST", Some("cache")),
                ("VALKEY_PORT", Some("6380")),
                ("VALKEY_DATABASE", Some("4")),
                ("VALKEY_RETRIES", None),
                ("VALKEY_DIAL_TIMEOUT", Some("500ms")),
            ],
            || {
                let config = ValkeyConfig::from_env().unwrap();
                assert_eq!(config.url(), "redis://cache:6380/4");
                assert_eq!(config.retries, 3);
                assert_eq!(config.dial_timeout, Duration::from_millis(500));
            },
        );
    }

    #[test]
    fn test_from_env_requires_host() {
        temp_env::with_var_unset("VALKEY_HOST", || {
            let err = ValkeyConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("VALKEY_HOST"));
        });
    }

    #[test]
    fn test_from_env_non_numeric_port() {
        temp_env::with_vars(
            [("VALKEY_HOST", Some("cache")), ("VALKEY_PORT", Some("redis"))],
            || {
                let err = ValkeyConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("VALKEY_PORT"));
            },
        );
    }
}
