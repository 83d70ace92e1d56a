//! # Lifecycle
//!
//! Building blocks for running long-lived network servers until a
//! termination signal or parent cancellation arrives, then shutting them
//! down in an orderly, time-bounded way.
//!
//! ## Modules
//!
//! - **[`handle`]**: one-shot cancellation signal shared by the tasks of a run
//! - **[`termination`]**: SIGINT/SIGTERM → cancellation of a derived handle
//! - **[`task_group`]**: run tasks together, first error cancels the rest
//! - **[`classify`]**: expected-shutdown error classification
//! - **[`listener`]**: exclusively owned, close-once TCP listener
//! - **[`error`]**: the run error taxonomy
//!
//! ## Example
//!
//! ```ignore
//! use lifecycle::{LifecycleHandle, TaskGroup, TerminationSource};
//!
//! let root = LifecycleHandle::new();
//! let termination = TerminationSource::install(&root)?;
//!
//! let mut group = TaskGroup::new(termination.handle().child());
//! group.spawn("serve", serve(listener));
//! group.spawn("shutdown", shutdown(handle));
//! group.wait().await?;
//! ```

pub mod classify;
pub mod error;
pub mod handle;
pub mod listener;
pub mod task_group;
pub mod termination;

use std::time::Duration;

pub use classify::{is_expected_shutdown_error, is_resource_exhaustion, suppress_expected};
pub use error::{BoxError, ErrorKind, ServeError, ServeResult};
pub use handle::LifecycleHandle;
pub use listener::{Incoming, ListenerHandle};
pub use task_group::TaskGroup;
pub use termination::{FORCED_EXIT_CODE, TerminationSource};

/// Default bound on how long a drain may take before it is abandoned.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an in-progress drain may run before open connections are
/// forcibly closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownPolicy {
    timeout: Duration,
}

impl ShutdownPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_TIMEOUT)
    }
}
