use tokio_util::sync::{CancellationToken, WaitForCancellationFuture, WaitForCancellationFutureOwned};
use tracing::debug;

/// A one-shot cancellation signal shared by the tasks of a single run.
///
/// The only transition is `active → cancelled`. Cancelling is idempotent,
/// and cancelling a handle cancels every handle derived from it with
/// [`LifecycleHandle::child`], never the other way around.
#[derive(Clone, Debug, Default)]
pub struct LifecycleHandle {
    token: CancellationToken,
}

impl LifecycleHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a handle that is cancelled together with `self`, but whose
    /// own cancellation does not propagate upward.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Transition to cancelled. Calling this on a cancelled handle is a no-op.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("cancelling lifecycle handle");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the handle is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Owned variant of [`LifecycleHandle::cancelled`], for APIs that need a
    /// `'static` shutdown future.
    pub fn cancelled_owned(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }
}
