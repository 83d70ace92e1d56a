use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::classify::is_expected_shutdown_error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ServeResult<T = ()> = Result<T, ServeError>;

/// Where an error sits in the run's error taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Binding or listening failed before serving began. No drain is attempted.
    Startup,
    /// The serve call failed for a reason other than an intentional stop.
    OperationalServe,
    /// A normal consequence of tearing the server down. Always suppressed.
    ExpectedShutdown,
    /// The drain exceeded its [`ShutdownPolicy`](crate::ShutdownPolicy) bound.
    ShutdownTimeout,
}

/// Errors produced by a server run.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to install {signal} handler: {source}")]
    Signal {
        signal: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("listener on {0} was closed before serving began")]
    ListenerUnavailable(SocketAddr),

    #[error("failed to start server: {0}")]
    Startup(#[source] BoxError),

    #[error("server error: {0}")]
    Serve(#[source] BoxError),

    #[error("I/O error while serving: {0}")]
    Io(#[from] io::Error),

    #[error("{task} task failed: {message}")]
    TaskFailed { task: &'static str, message: String },

    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("listener already closed")]
    ListenerClosed,

    #[error("server closed")]
    ServerClosed,

    #[error("server stopped")]
    ServerStopped,
}

impl ServeError {
    pub fn kind(&self) -> ErrorKind {
        if is_expected_shutdown_error(self) {
            return ErrorKind::ExpectedShutdown;
        }

        match self {
            ServeError::Bind { .. }
            | ServeError::Signal { .. }
            | ServeError::ListenerUnavailable(_)
            | ServeError::Startup(_) => ErrorKind::Startup,
            ServeError::ShutdownTimeout(_) => ErrorKind::ShutdownTimeout,
            ServeError::Serve(_)
            | ServeError::Io(_)
            | ServeError::TaskFailed { .. }
            | ServeError::ListenerClosed
            | ServeError::ServerClosed
            | ServeError::ServerStopped => ErrorKind::OperationalServe,
        }
    }

    pub fn serve(err: impl Into<BoxError>) -> Self {
        ServeError::Serve(err.into())
    }
}
