//! Expected-shutdown error classification.
//!
//! Tearing down a listener while connections are being accepted races by
//! nature: the accept loop can see a closed socket, a reset peer or a stale
//! descriptor. Those errors are absorbed here and nowhere else.

use std::error::Error;
use std::io;
use tracing::debug;

use crate::error::{ServeError, ServeResult};

/// Whether `err` is a normal consequence of an intentional shutdown.
///
/// Walks the source chain. Matches the server's own closed/stopped
/// sentinels, an already closed listener, reset or aborted connections and
/// operations on a stale file descriptor. Startup failures and drain
/// timeouts are never expected.
pub fn is_expected_shutdown_error(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);

    while let Some(err) = current {
        if let Some(serve) = err.downcast_ref::<ServeError>() {
            match serve {
                ServeError::ListenerClosed | ServeError::ServerClosed | ServeError::ServerStopped => {
                    return true;
                }
                ServeError::Bind { .. }
                | ServeError::Signal { .. }
                | ServeError::ListenerUnavailable(_)
                | ServeError::Startup(_)
                | ServeError::TaskFailed { .. }
                | ServeError::ShutdownTimeout(_) => return false,
                ServeError::Serve(_) | ServeError::Io(_) => {}
            }
        } else if let Some(io) = err.downcast_ref::<io::Error>() {
            if is_expected_io_error(io) {
                return true;
            }
            // io::Error::source skips the wrapped error itself
            if let Some(inner) = io.get_ref() {
                if is_expected_shutdown_error(inner) {
                    return true;
                }
            }
        }

        current = err.source();
    }

    false
}

/// Maps expected-shutdown errors to `Ok(())`, passing everything else through.
pub fn suppress_expected(result: ServeResult) -> ServeResult {
    match result {
        Err(err) if is_expected_shutdown_error(&err) => {
            debug!(error = %err, "ignoring expected shutdown error");
            Ok(())
        }
        other => other,
    }
}

fn is_expected_io_error(err: &io::Error) -> bool {
    match err.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => true,
        _ => is_bad_descriptor(err),
    }
}

/// Whether an accept failure is a momentary shortage of descriptors,
/// buffers or memory that a retry after a short pause can get past.
///
/// Any other accept failure ends the serve loop.
#[cfg(unix)]
pub fn is_resource_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(not(unix))]
pub fn is_resource_exhaustion(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::OutOfMemory
}

#[cfg(unix)]
fn is_bad_descriptor(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EBADF)
}

#[cfg(not(unix))]
fn is_bad_descriptor(_err: &io::Error) -> bool {
    false
}
