//! Server configuration loaded from environment variables.

use core_config::{ConfigError, FromEnv, env_duration, env_or_default};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "[::1]";
pub const DEFAULT_PORT: u16 = 50051;
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(60);

/// Configuration for gRPC server.
#[derive(Debug, Clone)]
pub struct GrpcConfig {
    /// Host to bind to (default: [::1] for IPv6 localhost)
    pub host: String,
    /// Port to listen on (default: 50051)
    pub port: u16,
    /// Fully qualified service name reported as serving, besides the
    /// empty (overall) name
    pub service_name: Option<String>,
    /// HTTP/2 keepalive ping interval (default: 60s)
    pub keepalive: Duration,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            service_name: None,
            keepalive: DEFAULT_KEEPALIVE,
        }
    }
}

impl GrpcConfig {
    /// Create a new server config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host to bind to.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port to listen on.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Get the socket address to bind to.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.addr_string().parse()
    }

    /// Get the address string (for binding and logging).
    pub fn addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for GrpcConfig {
    /// Reads:
    /// - `GRPC_HOST` (default: [::1])
    /// - `GRPC_PORT` (default: 50051)
    /// - `GRPC_SERVICE_NAME` (optional)
    /// - `GRPC_KEEPALIVE` (default: 60s)
    fn from_env() -> Result<Self, ConfigError> {
        let port = env_or_default("GRPC_PORT", &DEFAULT_PORT.to_string())
            .parse()
            .map_err(|e| ConfigError::ParseError {
                key: "GRPC_PORT".to_string(),
                details: format!("{}", e),
            })?;
        let service_name = std::env::var("GRPC_SERVICE_NAME")
            .ok()
            .filter(|name| !name.trim().is_empty());

        Ok(Self {
            host: env_or_default("GRPC_HOST", DEFAULT_HOST),
            port,
            service_name,
            keepalive: env_duration("GRPC_KEEPALIVE", DEFAULT_KEEPALIVE)?,
        })
    }
}
