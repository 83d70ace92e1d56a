use super::connection;
use super::health::status_router;
use crate::errors::handlers::{method_not_allowed, not_found};
use axum::Router;
use core_config::{AppInfo, server::ServerConfig};
use futures::StreamExt;
use lifecycle::{
    Incoming, LifecycleHandle, ListenerHandle, ServeError, ServeResult, ShutdownPolicy, TaskGroup,
    is_expected_shutdown_error, is_resource_exhaustion, suppress_expected,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, error, info, warn};

/// Pause after an accept error caused by resource exhaustion (e.g. EMFILE)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Connection-level time limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Time allowed to receive a request's headers
    pub read_header: Duration,
    /// Time allowed for the router to produce a response
    pub write: Duration,
    /// How long a keep-alive connection may sit without a request; zero
    /// keeps idle connections open
    pub idle: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for HttpTimeouts {
    fn from(config: &ServerConfig) -> Self {
        Self {
            read_header: config.read_timeout,
            write: config.write_timeout,
            idle: config.idle_timeout,
        }
    }
}

#[derive(Debug)]
enum Endpoint {
    Address(String),
    Bound(ListenerHandle),
}

/// A router plus where and how to serve it.
#[derive(Debug)]
pub struct HttpServer {
    endpoint: Endpoint,
    router: Router,
    timeouts: HttpTimeouts,
}

impl HttpServer {
    /// Serve `router` on `addr` ("host:port"), bound when the server runs.
    pub fn new(addr: impl Into<String>, router: Router) -> Self {
        Self {
            endpoint: Endpoint::Address(addr.into()),
            router,
            timeouts: HttpTimeouts::default(),
        }
    }

    /// Serve `router` on an already bound listener.
    pub fn with_listener(listener: ListenerHandle, router: Router) -> Self {
        Self {
            endpoint: Endpoint::Bound(listener),
            router,
            timeouts: HttpTimeouts::default(),
        }
    }

    pub fn from_config(config: &ServerConfig, router: Router) -> Self {
        Self::new(config.address(), router).with_timeouts(HttpTimeouts::from(config))
    }

    pub fn with_timeouts(mut self, timeouts: HttpTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> HttpTimeouts {
        self.timeouts
    }
}

impl Endpoint {
    async fn bind(self) -> ServeResult<ListenerHandle> {
        match self {
            Endpoint::Address(addr) => ListenerHandle::bind(addr.as_str()).await,
            Endpoint::Bound(listener) => Ok(listener),
        }
    }
}

/// Runs an HTTP server until `parent` (or the server's own failure) stops it.
///
/// Lifecycle:
/// - Binds first. A bind failure is returned immediately as a startup error
///   and nothing else is started.
/// - Serves on a handle derived from `parent`.
/// - On cancellation stops accepting and lets in-flight requests finish for
///   up to `policy.timeout()`. Connections still open after that are closed
///   and [`ServeError::ShutdownTimeout`] is returned.
///
/// Returns `Ok(())` for a clean stop. Cancelling `parent` is the only way to
/// stop it from outside; the derived handle never cancels `parent`.
///
/// # Example
/// ```ignore
/// use axum_helpers::server::{HttpServer, run_http_server};
/// use lifecycle::{LifecycleHandle, ShutdownPolicy};
///
/// let root = LifecycleHandle::new();
/// let server = HttpServer::new("0.0.0.0:8080", router);
/// run_http_server(&root, server, ShutdownPolicy::default()).await?;
/// ```
pub async fn run_http_server(
    parent: &LifecycleHandle,
    server: HttpServer,
    policy: ShutdownPolicy,
) -> ServeResult {
    let HttpServer {
        endpoint,
        router,
        timeouts,
    } = server;

    let listener = Arc::new(endpoint.bind().await?);
    let incoming = listener.incoming()?;
    info!(addr = %listener.local_addr(), "Server starting");

    serve_until_stopped(parent, listener, incoming, router, timeouts, policy).await
}

async fn serve_until_stopped(
    parent: &LifecycleHandle,
    listener: Arc<ListenerHandle>,
    incoming: Incoming,
    router: Router,
    timeouts: HttpTimeouts,
    policy: ShutdownPolicy,
) -> ServeResult {
    let handle = parent.child();
    let drained = CancellationToken::new();
    let force_close = CancellationToken::new();

    let mut group = TaskGroup::new(handle.clone());
    group.spawn("serve", {
        let drained = drained.clone();
        let force_close = force_close.clone();
        async move {
            suppress_expected(serve(incoming, router, timeouts, drained, force_close).await)
        }
    });
    group.spawn("drain", drain(handle, listener, policy, drained, force_close));

    group.wait().await
}

/// Accept loop. Ends with [`ServeError::ServerClosed`] once the listener is
/// closed and every connection has finished or been forced closed.
///
/// An accept failure other than a dropped peer or resource exhaustion
/// aborts every open connection and is returned as [`ServeError::Io`].
async fn serve(
    mut incoming: Incoming,
    router: Router,
    timeouts: HttpTimeouts,
    drained: CancellationToken,
    force_close: CancellationToken,
) -> ServeResult {
    let _drained = drained.drop_guard();
    let draining = CancellationToken::new();
    let mut connections = JoinSet::new();

    while let Some(accepted) = incoming.next().await {
        let stream = match accepted {
            Ok(stream) => stream,
            Err(err) if is_expected_shutdown_error(&err) => {
                debug!(error = %err, "peer went away before accept completed");
                continue;
            }
            Err(err) if is_resource_exhaustion(&err) => {
                warn!(error = %err, backoff = ?ACCEPT_ERROR_BACKOFF, "failed to accept connection, retrying");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
            Err(err) => {
                error!(error = %err, open = connections.len(), "accept failed, closing connections");
                connections.shutdown().await;
                return Err(ServeError::Io(err));
            }
        };

        // reap finished connections
        while connections.try_join_next().is_some() {}

        connection::spawn(
            &mut connections,
            stream,
            router.clone(),
            timeouts,
            draining.clone(),
        );
    }

    debug!(open = connections.len(), "Stopped accepting, draining connections");
    draining.cancel();
    tokio::select! {
        _ = async { while connections.join_next().await.is_some() {} } => {
            debug!("All connections drained");
        }
        _ = force_close.cancelled() => {
            warn!("Closing connections that did not drain in time");
        }
    }
    connections.shutdown().await;

    Err(ServeError::ServerClosed)
}

/// Waits for cancellation, closes the listener, then bounds the drain.
async fn drain(
    handle: LifecycleHandle,
    listener: Arc<ListenerHandle>,
    policy: ShutdownPolicy,
    drained: CancellationToken,
    force_close: CancellationToken,
) -> ServeResult {
    handle.cancelled().await;
    info!(timeout = ?policy.timeout(), "Shutting down server...");

    suppress_expected(listener.close())?;

    if tokio::time::timeout(policy.timeout(), drained.cancelled())
        .await
        .is_err()
    {
        force_close.cancel();
        return Err(ServeError::ShutdownTimeout(policy.timeout()));
    }

    info!("Server stopped");
    Ok(())
}

/// Starts an HTTP server from configuration, stopping when `parent` is cancelled.
///
/// Shorthand for [`run_http_server`] with the address, timeouts and shutdown
/// policy taken from `server_config`.
pub async fn create_app(
    router: Router,
    server_config: &ServerConfig,
    parent: &LifecycleHandle,
) -> ServeResult {
    let server = HttpServer::from_config(server_config, router);
    let policy = ShutdownPolicy::new(server_config.shutdown_timeout);

    run_http_server(parent, server, policy)
        .await
        .inspect_err(|e| {
            error!(error = %e, "Server encountered an error");
        })
}

/// Creates the application router.
///
/// This function sets up:
/// - `__health__` and `__version__` status endpoints
/// - `apis` merged alongside them
/// - everything nested under `base_path` (e.g. `/api`); an empty base path
///   or `/` serves at the root
/// - JSON 404/405 fallbacks and request tracing
///
/// # Example
/// ```ignore
/// use axum_helpers::server::create_router;
/// use core_config::app_info;
///
/// let api_routes = Router::new().route("/items", get(list_items));
/// let router = create_router("/api", app_info!(), api_routes);
/// // GET /api/__health__, GET /api/items
/// ```
pub fn create_router(base_path: &str, app_info: AppInfo, apis: Router) -> Router {
    let routes = status_router(app_info)
        .merge(apis)
        .method_not_allowed_fallback(method_not_allowed);
    let base_path = normalize_base_path(base_path);

    let router = if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(&base_path, routes)
    };
    debug!(base_path = %base_path, "All routes registered");

    router.fallback(not_found).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// `"api/"` -> `"/api"`, `"/"` -> `""`
fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
