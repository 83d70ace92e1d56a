//! # gRPC Server Library
//!
//! Lifecycle-managed tonic servers with the standard health
//! (`grpc.health.v1.Health`) and reflection services built in.
//!
//! - Health reports `SERVING` for the empty name and every registered
//!   service while running, `NOT_SERVING` once shutdown begins.
//! - Reflection lists the health and reflection services plus any
//!   descriptor sets registered with
//!   [`GrpcServer::with_file_descriptor_set`].
//!
//! See [`server`] for a full example.

pub mod server;

pub use server::{GrpcConfig, GrpcServer, run_grpc_server};
