//! Process termination signals as lifecycle cancellation.
//!
//! Handles SIGINT (Ctrl-C in development) and SIGTERM (what orchestrators
//! send on pod eviction). The first signal cancels the derived handle; a
//! second signal while shutdown is still in progress exits the process.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::ServeResult;
use crate::handle::LifecycleHandle;

/// Exit code used when a repeated termination signal forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Converts termination signals and parent cancellation into a single
/// cancellation of a derived [`LifecycleHandle`].
///
/// Signal listeners are registered when the source is installed, so a signal
/// that arrives immediately afterwards is not lost. The listener task is
/// aborted when the source is dropped.
pub struct TerminationSource {
    handle: LifecycleHandle,
    listener: JoinHandle<()>,
}

impl TerminationSource {
    /// Derive a handle from `parent` that is also cancelled by SIGINT/SIGTERM.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns a startup error if a signal handler cannot be registered.
    pub fn install(parent: &LifecycleHandle) -> ServeResult<Self> {
        let handle = parent.child();
        let signals = Signals::register()?;
        let listener = tokio::spawn(listen(signals, handle.clone()));

        Ok(Self { handle, listener })
    }

    /// The derived handle.
    pub fn handle(&self) -> &LifecycleHandle {
        &self.handle
    }
}

impl Drop for TerminationSource {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(mut signals: Signals, handle: LifecycleHandle) {
    tokio::select! {
        _ = handle.cancelled() => {}
        signal = signals.recv() => {
            info!(signal, "received termination signal, initiating graceful shutdown");
            handle.cancel();
        }
    }

    // Once shutdown is under way another signal must not be swallowed.
    let signal = signals.recv().await;
    warn!(signal, "received termination signal during shutdown, exiting immediately");
    std::process::exit(FORCED_EXIT_CODE);
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn register() -> ServeResult<Self> {
        use crate::error::ServeError;
        use tokio::signal::unix::{SignalKind, signal};

        let interrupt = signal(SignalKind::interrupt()).map_err(|source| ServeError::Signal {
            signal: "SIGINT",
            source,
        })?;
        let terminate = signal(SignalKind::terminate()).map_err(|source| ServeError::Signal {
            signal: "SIGTERM",
            source,
        })?;

        Ok(Self {
            interrupt,
            terminate,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn register() -> ServeResult<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "Ctrl+C"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_parent_cancellation_propagates() {
        let parent = LifecycleHandle::new();
        let source = TerminationSource::install(&parent).unwrap();
        assert!(!source.handle().is_cancelled());

        parent.cancel();

        tokio::time::timeout(Duration::from_secs(1), source.handle().cancelled())
            .await
            .expect("derived handle was not cancelled");
    }

    #[tokio::test]
    async fn test_already_cancelled_parent() {
        let parent = LifecycleHandle::new();
        parent.cancel();

        let source = TerminationSource::install(&parent).unwrap();
        assert!(source.handle().is_cancelled());
    }

    #[tokio::test]
    async fn test_derived_cancellation_does_not_reach_parent() {
        let parent = LifecycleHandle::new();
        let source = TerminationSource::install(&parent).unwrap();

        source.handle().cancel();
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_sources_coexist() {
        let parent = LifecycleHandle::new();
        let first = TerminationSource::install(&parent).unwrap();
        let second = TerminationSource::install(&parent).unwrap();

        first.handle().cancel();
        assert!(!second.handle().is_cancelled());

        parent.cancel();
        assert!(second.handle().is_cancelled());
    }
}
