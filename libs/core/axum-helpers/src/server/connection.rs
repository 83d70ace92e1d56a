//! Per-connection serving, HTTP/1 or HTTP/2 (auto-detected).
//!
//! Each accepted socket runs on its own task. The task ends when the client
//! goes away, when the connection sits idle past the idle timeout, or when
//! a drain closes it after its in-flight requests.

use super::app::HttpTimeouts;
use crate::{errors::ErrorResponse, response::write_json};
use axum::{Router, http::StatusCode, response::Response};
use futures::future::BoxFuture;
use hyper::{Request, body::Incoming};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
};
use lifecycle::is_expected_shutdown_error;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{debug, trace, warn};

fn connection_builder(timeouts: &HttpTimeouts) -> auto::Builder<TokioExecutor> {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read_header)
        .keep_alive(true);
    builder.http2().timer(TokioTimer::new());
    builder
}

/// Serve one accepted socket on a new task in `connections`.
///
/// Cancelling `draining` lets the connection finish its in-flight requests
/// and then close.
pub(crate) fn spawn(
    connections: &mut JoinSet<()>,
    stream: TcpStream,
    router: Router,
    timeouts: HttpTimeouts,
    draining: CancellationToken,
) {
    let peer = stream.peer_addr().ok();

    connections.spawn(async move {
        let activity = Activity::new();
        let service = Dispatch {
            router,
            write_timeout: timeouts.write,
            activity: activity.clone(),
        };

        let builder = connection_builder(&timeouts);
        let connection = builder.serve_connection(TokioIo::new(stream), service);
        tokio::pin!(connection);
        let idle = activity.idle(timeouts.idle);
        tokio::pin!(idle);
        let mut closing = false;

        loop {
            tokio::select! {
                result = connection.as_mut() => {
                    match result {
                        Ok(()) => trace!(?peer, "connection closed"),
                        Err(err) if is_expected_shutdown_error(&*err) => {
                            trace!(?peer, error = %err, "connection reset by peer");
                        }
                        Err(err) => debug!(?peer, error = %err, "connection error"),
                    }
                    break;
                }
                _ = draining.cancelled(), if !closing => {
                    trace!(?peer, "draining connection");
                    closing = true;
                    connection.as_mut().graceful_shutdown();
                }
                _ = idle.as_mut(), if !closing => {
                    debug!(?peer, "closing idle connection");
                    break;
                }
            }
        }
    });
}

/// Routes each request on a connection through the router, bounded by the
/// write timeout.
#[derive(Clone)]
struct Dispatch {
    router: Router,
    write_timeout: Duration,
    activity: Activity,
}

impl hyper::service::Service<Request<Incoming>> for Dispatch {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let router = self.router.clone();
        let write_timeout = self.write_timeout;
        let in_flight = self.activity.begin();

        Box::pin(async move {
            let method = req.method().clone();
            let uri = req.uri().clone();

            let response = match tokio::time::timeout(write_timeout, router.oneshot(req)).await {
                Ok(Ok(response)) => response,
                Ok(Err(never)) => match never {},
                Err(_) => {
                    warn!(%method, %uri, timeout = ?write_timeout, "request exceeded write timeout");
                    write_json(
                        StatusCode::SERVICE_UNAVAILABLE,
                        &ErrorResponse::new(StatusCode::SERVICE_UNAVAILABLE, "request timed out"),
                    )
                }
            };

            drop(in_flight);
            Ok(response)
        })
    }
}

/// Tracks requests on one connection so an idle keep-alive can be closed.
#[derive(Clone)]
struct Activity {
    inner: Arc<ActivityState>,
}

struct ActivityState {
    opened: Instant,
    /// Milliseconds after `opened` of the last request start or finish
    last_seen: AtomicU64,
    in_flight: AtomicUsize,
}

impl Activity {
    fn new() -> Self {
        Self {
            inner: Arc::new(ActivityState {
                opened: Instant::now(),
                last_seen: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    fn begin(&self) -> InFlight {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        InFlight {
            activity: self.clone(),
        }
    }

    fn touch(&self) {
        let elapsed = self.inner.opened.elapsed().as_millis() as u64;
        self.inner.last_seen.store(elapsed, Ordering::SeqCst);
    }

    fn last_seen(&self) -> Instant {
        self.inner.opened + Duration::from_millis(self.inner.last_seen.load(Ordering::SeqCst))
    }

    fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Resolves once no request has been in flight for `timeout`.
    ///
    /// A zero timeout disables idle closing, as does one too large to
    /// express as a deadline; the future then never resolves.
    async fn idle(&self, timeout: Duration) {
        if timeout.is_zero() {
            return std::future::pending().await;
        }

        loop {
            let Some(deadline) = self.last_seen().checked_add(timeout) else {
                return std::future::pending().await;
            };
            tokio::time::sleep_until(deadline).await;

            if self.is_busy() {
                tokio::time::sleep(timeout).await;
                continue;
            }
            if self.last_seen().elapsed() >= timeout {
                return;
            }
        }
    }
}

struct InFlight {
    activity: Activity,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.activity.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.activity.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_resolves_after_timeout() {
        let activity = Activity::new();
        let started = Instant::now();

        activity.idle(Duration::from_secs(60)).await;

        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_waits_for_in_flight_request() {
        let activity = Activity::new();
        let request = activity.begin();

        let idle = activity.clone();
        let watcher = tokio::spawn(async move { idle.idle(Duration::from_secs(1)).await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!watcher.is_finished());

        drop(request);
        let released = Instant::now();
        watcher.await.unwrap();
        assert!(released.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_idle_timeout_never_fires() {
        let activity = Activity::new();

        let fired = tokio::time::timeout(Duration::from_secs(3600), activity.idle(Duration::ZERO)).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_idle_timeout_never_fires() {
        let activity = Activity::new();
        drop(activity.begin());

        let fired = tokio::time::timeout(Duration::from_secs(3600), activity.idle(Duration::MAX)).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_resets_idle_clock() {
        let activity = Activity::new();
        tokio::time::sleep(Duration::from_millis(800)).await;
        drop(activity.begin());

        let reset = Instant::now();
        activity.idle(Duration::from_secs(1)).await;
        assert!(reset.elapsed() >= Duration::from_millis(990));
    }
}
