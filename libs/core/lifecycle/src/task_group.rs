//! Structured concurrency for a single server run.

use std::collections::HashMap;
use std::future::Future;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, warn};

use crate::error::{ServeError, ServeResult};
use crate::handle::LifecycleHandle;

/// Runs a fixed set of tasks that share one [`LifecycleHandle`].
///
/// The first task to return an error cancels the handle so its siblings can
/// observe cancellation and leave through their own shutdown path. [`wait`]
/// joins every task before returning the first error it observed, so no task
/// outlives the group and no result goes uninspected. Dropping a group
/// without waiting aborts its tasks.
///
/// [`wait`]: TaskGroup::wait
pub struct TaskGroup {
    handle: LifecycleHandle,
    tasks: JoinSet<ServeResult>,
    names: HashMap<Id, &'static str>,
}

impl TaskGroup {
    pub fn new(handle: LifecycleHandle) -> Self {
        Self {
            handle,
            tasks: JoinSet::new(),
            names: HashMap::new(),
        }
    }

    /// The handle cancelled when any task fails.
    pub fn handle(&self) -> &LifecycleHandle {
        &self.handle
    }

    /// Start `task` on the runtime. `name` only appears in logs and errors.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ServeResult> + Send + 'static,
    {
        let abort = self.tasks.spawn(task);
        self.names.insert(abort.id(), name);
    }

    /// Wait for every task and return the first error observed.
    ///
    /// The handle is cancelled on the first error and again once all tasks
    /// have exited.
    pub async fn wait(mut self) -> ServeResult {
        let mut first_error: Option<ServeError> = None;

        while let Some(joined) = self.tasks.join_next_with_id().await {
            let (name, result) = match joined {
                Ok((id, result)) => (self.name_of(id), result),
                Err(err) => {
                    let name = self.name_of(err.id());
                    (name, Err(task_failure(name, err)))
                }
            };

            match result {
                Ok(()) => debug!(task = name, "task finished"),
                Err(err) if first_error.is_none() => {
                    warn!(task = name, error = %err, "task failed, cancelling remaining tasks");
                    self.handle.cancel();
                    first_error = Some(err);
                }
                Err(err) => {
                    debug!(task = name, error = %err, "task failed after cancellation");
                }
            }
        }

        self.handle.cancel();

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn name_of(&self, id: Id) -> &'static str {
        self.names.get(&id).copied().unwrap_or("unnamed")
    }
}

fn task_failure(task: &'static str, err: JoinError) -> ServeError {
    let message = if err.is_panic() {
        "panicked".to_string()
    } else {
        err.to_string()
    };
    ServeError::TaskFailed { task, message }
}
