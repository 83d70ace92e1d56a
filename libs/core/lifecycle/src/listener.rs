use futures::stream::{self, BoxStream, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ServeError, ServeResult};

/// Stream of accepted connections handed to a server.
pub type Incoming = BoxStream<'static, io::Result<TcpStream>>;

/// A bound TCP endpoint owned by exactly one server run.
///
/// The accept loop gets the socket through [`ListenerHandle::incoming`];
/// the shutdown path ends that stream with [`ListenerHandle::close`]. The
/// socket itself is released when the stream is dropped. Only the first
/// `close` succeeds, later calls report [`ServeError::ListenerClosed`].
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    closed: AtomicBool,
    close_signal: CancellationToken,
}

impl ListenerHandle {
    /// Bind a new listener.
    ///
    /// # Errors
    /// Returns [`ServeError::Bind`] if the address cannot be resolved or bound.
    pub async fn bind<A>(addr: A) -> ServeResult<Self>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServeError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Self::from_listener(listener)
    }

    /// Take ownership of an already bound listener.
    pub fn from_listener(listener: TcpListener) -> ServeResult<Self> {
        let local_addr = listener.local_addr().map_err(|source| ServeError::Bind {
            addr: "<pre-bound listener>".to_string(),
            source,
        })?;

        Ok(Self {
            local_addr,
            listener: Mutex::new(Some(listener)),
            closed: AtomicBool::new(false),
            close_signal: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Hand the socket to the accept loop.
    ///
    /// The stream ends once [`ListenerHandle::close`] is called.
    ///
    /// # Errors
    /// Returns [`ServeError::ListenerUnavailable`] if the listener was closed
    /// or already handed out.
    pub fn incoming(&self) -> ServeResult<Incoming> {
        let listener = if self.is_closed() {
            None
        } else {
            self.take()
        };
        let listener = listener.ok_or(ServeError::ListenerUnavailable(self.local_addr))?;

        let closed = self.close_signal.clone();
        let accepted = stream::unfold((listener, closed), |(listener, closed)| async move {
            let accepted = tokio::select! {
                biased;
                _ = closed.cancelled() => return None,
                accepted = listener.accept() => accepted.map(|(stream, _)| stream),
            };
            Some((accepted, (listener, closed)))
        });

        Ok(accepted.boxed())
    }

    /// Stop accepting connections.
    ///
    /// # Errors
    /// Returns [`ServeError::ListenerClosed`] if the listener was already
    /// closed.
    pub fn close(&self) -> ServeResult {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ServeError::ListenerClosed);
        }

        self.close_signal.cancel();
        // Releases the socket right away if it was never handed out.
        drop(self.take());
        debug!(addr = %self.local_addr, "listener closed");
        Ok(())
    }

    fn take(&self) -> Option<TcpListener> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
