//! gRPC Server
//!
//! Runs tonic services under the lifecycle rules, with health checks and
//! reflection registered for every server.
//!
//! ```ignore
//! use grpc_server::server::{GrpcConfig, GrpcServer, run_grpc_server};
//! use lifecycle::{ListenerHandle, TerminationSource};
//! use rpc::tasks::tasks_service_server::TasksServiceServer;
//! use tonic::codec::CompressionEncoding;
//!
//! let config = GrpcConfig::from_env()?;
//! let service = TasksServiceServer::new(my_impl)
//!     .accept_compressed(CompressionEncoding::Zstd)
//!     .send_compressed(CompressionEncoding::Zstd);
//!
//! let listener = ListenerHandle::bind(config.addr_string()).await?;
//! let server = GrpcServer::new(config).add_service(service);
//! run_grpc_server(termination.handle(), server, listener).await?;
//! ```

mod builder;
mod config;

pub use builder::{GrpcServer, run_grpc_server};
pub use config::{DEFAULT_HOST, DEFAULT_KEEPALIVE, DEFAULT_PORT, GrpcConfig};
