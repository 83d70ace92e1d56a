//! gRPC server runner.
//!
//! Serves the application's routes alongside the standard health
//! (`grpc.health.v1.Health`) and reflection (`grpc.reflection.v1`) services,
//! under the same lifecycle rules as the HTTP runner: serve until the
//! handle is cancelled, then stop gracefully.

use super::config::GrpcConfig;
use lifecycle::{
    Incoming, LifecycleHandle, ListenerHandle, ServeError, ServeResult, TaskGroup,
    suppress_expected,
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::body::Body;
use tonic::codegen::{Service, http};
use tonic::server::NamedService;
use tonic::service::Routes;
use tonic::transport::Server;
use tonic_health::ServingStatus;
use tonic_health::server::HealthReporter;
use tracing::info;

/// The application's gRPC services plus what the health and reflection
/// services should report about them.
///
/// # Example
///
/// ```ignore
/// use grpc_server::{GrpcConfig, GrpcServer, run_grpc_server};
/// use lifecycle::ListenerHandle;
/// use rpc::todo::todo_service_server::TodoServiceServer;
///
/// let config = GrpcConfig::from_env()?;
/// let server = GrpcServer::new(config.clone())
///     .add_service(TodoServiceServer::new(my_impl))
///     .with_file_descriptor_set(rpc::FILE_DESCRIPTOR_SET);
///
/// let listener = ListenerHandle::bind(config.addr_string()).await?;
/// run_grpc_server(&root, server, listener).await?;
/// ```
pub struct GrpcServer {
    config: GrpcConfig,
    routes: Routes,
    service_names: Vec<String>,
    descriptor_sets: Vec<&'static [u8]>,
}

impl GrpcServer {
    pub fn new(config: GrpcConfig) -> Self {
        let service_names = config.service_name.iter().cloned().collect();
        Self {
            config,
            routes: Routes::default(),
            service_names,
            descriptor_sets: Vec::new(),
        }
    }

    /// Register an application service. Its name is reported as serving by
    /// the health service while the server runs.
    pub fn add_service<S>(mut self, service: S) -> Self
    where
        S: Service<http::Request<Body>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + Sync
            + 'static,
        S::Response: axum::response::IntoResponse,
        S::Future: Send + 'static,
    {
        self.mark_name(S::NAME);
        self.routes = self.routes.add_service(service);
        self
    }

    /// Expose an encoded `FileDescriptorSet` through reflection.
    pub fn with_file_descriptor_set(mut self, descriptor_set: &'static [u8]) -> Self {
        self.descriptor_sets.push(descriptor_set);
        self
    }

    pub fn config(&self) -> &GrpcConfig {
        &self.config
    }

    /// Names the health service reports, besides the empty (overall) name.
    pub fn service_names(&self) -> &[String] {
        &self.service_names
    }

    fn mark_name(&mut self, name: &str) {
        if !self.service_names.iter().any(|known| known == name) {
            self.service_names.push(name.to_string());
        }
    }

    /// Log server startup information.
    pub fn log_startup(&self, listener: &ListenerHandle) {
        info!(
            addr = %listener.local_addr(),
            services = ?self.service_names,
            "gRPC server starting"
        );
        info!("Health check service enabled (grpc.health.v1.Health)");
        info!("Reflection service enabled (grpc.reflection.v1.ServerReflection)");
    }

    /// Set the status of every registered service and of the empty
    /// service name (used by k8s default health checks).
    pub async fn set_health(&self, health_reporter: &HealthReporter, status: ServingStatus) {
        for service_name in &self.service_names {
            health_reporter
                .set_service_status(service_name, status)
                .await;
        }
        health_reporter.set_service_status("", status).await;

        info!(services = ?self.service_names, ?status, "Health status updated");
    }
}

/// Runs a gRPC server on `listener` until `parent` (or the server's own
/// failure) stops it.
///
/// Startup marks every service and the empty name `SERVING`. On
/// cancellation they are marked `NOT_SERVING`, the server stops accepting
/// and waits for in-flight calls to finish, then the listener is closed.
/// There is no drain bound; streaming calls the client keeps open hold the
/// stop.
///
/// # Errors
/// - [`ServeError::ListenerUnavailable`] if the listener is already closed
///   or in use (startup).
/// - [`ServeError::Startup`] if a reflection descriptor set is invalid.
/// - [`ServeError::Serve`] if the transport fails while serving, or stops
///   before shutdown was requested.
pub async fn run_grpc_server(
    parent: &LifecycleHandle,
    server: GrpcServer,
    listener: ListenerHandle,
) -> ServeResult {
    let listener = Arc::new(listener);
    let incoming = listener.incoming()?;

    serve_until_stopped(parent, server, listener, incoming).await
}

async fn serve_until_stopped(
    parent: &LifecycleHandle,
    server: GrpcServer,
    listener: Arc<ListenerHandle>,
    incoming: Incoming,
) -> ServeResult {
    let reflection = server
        .descriptor_sets
        .iter()
        .copied()
        .fold(
            tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(tonic_health::pb::FILE_DESCRIPTOR_SET),
            |builder, descriptor_set| builder.register_encoded_file_descriptor_set(descriptor_set),
        )
        .build_v1()
        .map_err(|err| ServeError::Startup(Box::new(err)))?;

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    server.log_startup(&listener);
    server
        .set_health(&health_reporter, ServingStatus::Serving)
        .await;

    let router = Server::builder()
        .http2_keepalive_interval(Some(server.config.keepalive))
        .add_routes(server.routes.clone())
        .add_service(health_service)
        .add_service(reflection);

    let handle = parent.child();
    let stop = CancellationToken::new();
    let stopped = CancellationToken::new();
    let mut group = TaskGroup::new(handle.clone());

    group.spawn("serve", {
        let stop = stop.clone();
        let stopped = stopped.clone();
        async move {
            let _stopped = stopped.drop_guard();
            let result = router
                .serve_with_incoming_shutdown(incoming, stop.clone().cancelled_owned())
                .await;

            suppress_expected(match result {
                Ok(()) if stop.is_cancelled() => Err(ServeError::ServerStopped),
                Ok(()) => Err(ServeError::serve(
                    "gRPC server stopped before shutdown was requested",
                )),
                Err(err) => Err(ServeError::serve(err)),
            })
        }
    });

    group.spawn("shutdown", async move {
        handle.cancelled().await;
        info!("Stopping gRPC server...");

        server
            .set_health(&health_reporter, ServingStatus::NotServing)
            .await;
        stop.cancel();
        stopped.cancelled().await;

        suppress_expected(listener.close())?;
        info!("gRPC server stopped");
        Ok(())
    });

    group.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_from_config_is_reported() {
        let server = GrpcServer::new(GrpcConfig::new().with_service_name("todo.v1.TodoService"));
        assert_eq!(server.service_names(), ["todo.v1.TodoService"]);
    }

    #[tokio::test]
    async fn test_unrequested_stop_is_operational_serve_error() {
        let root = LifecycleHandle::new();
        let listener = Arc::new(ListenerHandle::bind("127.0.0.1:0").await.unwrap());
        let incoming: Incoming =
            Box::pin(tokio_stream::empty::<std::io::Result<tokio::net::TcpStream>>());

        let err = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            serve_until_stopped(&root, GrpcServer::new(GrpcConfig::new()), listener.clone(), incoming),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(matches!(err, ServeError::Serve(_)), "got {err:?}");
        assert_eq!(err.kind(), lifecycle::ErrorKind::OperationalServe);
        // the shutdown task still ran and released the listener
        assert!(listener.is_closed());
        assert!(!root.is_cancelled());
    }

    #[test]
    fn test_added_service_is_reported_once() {
        let reflection = tonic_reflection::server::Builder::configure()
            .build_v1alpha()
            .unwrap();

        let server = GrpcServer::new(
            GrpcConfig::new().with_service_name("grpc.reflection.v1alpha.ServerReflection"),
        )
        .add_service(reflection);

        assert_eq!(
            server.service_names(),
            ["grpc.reflection.v1alpha.ServerReflection"]
        );
    }
}
