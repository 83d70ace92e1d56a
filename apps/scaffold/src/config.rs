use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use grpc_server::GrpcConfig;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application configuration, composed from the shared config components.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub grpc: GrpcConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?, // HOST=0.0.0.0, PORT=8080, HTTP_BASE_PATH=/api
            grpc: GrpcConfig::from_env()?,     // GRPC_HOST=[::1], GRPC_PORT=50051
        })
    }
}
