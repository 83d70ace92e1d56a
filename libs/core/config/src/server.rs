use crate::{ConfigError, FromEnv, env_duration, env_or_default};
use std::net::Ipv4Addr;
use std::time::Duration;

pub const DEFAULT_BASE_PATH: &str = "/api";
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Server configuration for HTTP APIs
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix every route is registered under
    pub base_path: String,
    /// Time allowed to read a request's headers
    pub read_timeout: Duration,
    /// Time allowed to produce a response
    pub write_timeout: Duration,
    /// How long a keep-alive connection may sit without a request
    pub idle_timeout: Duration,
    /// Bound on draining in-flight requests at shutdown
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            ..Self::default()
        }
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// Reads from environment variables with sensible defaults:
    /// - HOST: defaults to Ipv4Addr::UNSPECIFIED (0.0.0.0 - all interfaces)
    /// - PORT: defaults to 8080
    /// - HTTP_BASE_PATH: defaults to /api
    /// - HTTP_READ_TIMEOUT / HTTP_WRITE_TIMEOUT: default 15s
    /// - HTTP_IDLE_TIMEOUT: defaults to 60s
    /// - SHUTDOWN_TIMEOUT: defaults to 5s
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_or_default("PORT", "8080").parse().map_err(|e| {
            ConfigError::ParseError {
                key: "PORT".to_string(),
                details: format!("{}", e),
            }
        })?;

        Ok(Self {
            host,
            port,
            base_path: env_or_default("HTTP_BASE_PATH", DEFAULT_BASE_PATH),
            read_timeout: env_duration("HTTP_READ_TIMEOUT", DEFAULT_READ_TIMEOUT)?,
            write_timeout: env_duration("HTTP_WRITE_TIMEOUT", DEFAULT_WRITE_TIMEOUT)?,
            idle_timeout: env_duration("HTTP_IDLE_TIMEOUT", DEFAULT_IDLE_TIMEOUT)?,
            shutdown_timeout: env_duration("SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT)?,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 8080,
            base_path: DEFAULT_BASE_PATH.to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "HOST",
        "PORT",
        "HTTP_BASE_PATH",
        "HTTP_READ_TIMEOUT",
        "HTTP_WRITE_TIMEOUT",
        "HTTP_IDLE_TIMEOUT",
        "SHUTDOWN_TIMEOUT",
    ];

    fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
        VARS.iter().map(|key| (*key, None)).collect()
    }

    #[test]
    fn test_server_config_from_env_with_defaults() {
        temp_env::with_vars(unset_all(), || {
            let config = ServerConfig::from_env().unwrap();
            assert_eq!(config.host, "0.0.0.0");
            assert_eq!(config.port, 8080);
            assert_eq!(config.address(), "0.0.0.0:8080");
            assert_eq!(config.base_path, "/api");
            assert_eq!(config.read_timeout, Duration::from_secs(15));
            assert_eq!(config.write_timeout, Duration::from_secs(15));
            assert_eq!(config.idle_timeout, Duration::from_secs(60));
            assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        });
    }

    #[test]
    fn test_server_config_from_env_with_custom_values() {
        temp_env::with_vars(
            [
                ("HOST", Some("127.0.0.1")),
                ("PORT", Some("3000")),
                ("HTTP_BASE_PATH", Some("/v1")),
                ("HTTP_READ_TIMEOUT", Some("2s")),
                ("HTTP_WRITE_TIMEOUT", Some("3")),
                ("HTTP_IDLE_TIMEOUT", Some("2m")),
                ("SHUTDOWN_TIMEOUT", Some("500ms")),
            ],
            || {
                let config = ServerConfig::from_env().unwrap();
                assert_eq!(config.address(), "127.0.0.1:3000");
                assert_eq!(config.base_path, "/v1");
                assert_eq!(config.read_timeout, Duration::from_secs(2));
                assert_eq!(config.write_timeout, Duration::from_secs(3));
                assert_eq!(config.idle_timeout, Duration::from_secs(120));
                assert_eq!(config.shutdown_timeout, Duration::from_millis(500));
            },
        );
    }

    #[test]
    fn test_server_config_from_env_invalid_port() {
        temp_env::with_var("PORT", Some("not_a_number"), || {
            let err = ServerConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("PORT"));
        });
    }

    #[test]
    fn test_server_config_from_env_port_out_of_range() {
        temp_env::with_var("PORT", Some("99999"), || {
            let err = ServerConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("PORT"));
        });
    }

    #[test]
    fn test_server_config_from_env_invalid_timeout() {
        temp_env::with_vars(
            [("PORT", None), ("SHUTDOWN_TIMEOUT", Some("forever"))],
            || {
                let err = ServerConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("SHUTDOWN_TIMEOUT"));
            },
        );
    }

    #[test]
    fn test_server_config_new_keeps_default_timeouts() {
        let config = ServerConfig::new("192.168.1.1".to_string(), 5000);
        assert_eq!(config.address(), "192.168.1.1:5000");
        assert_eq!(config.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
    }
}
