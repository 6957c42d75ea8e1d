//! One-shot timer abstraction used for debounce and retry.
//!
//! Each purpose (debounce, retry) owns at most one `TaskHandle`; re-arming
//! cancels the previous one. Dropping a handle detaches the task instead of
//! cancelling it.

use std::time::Duration;

use futures_util::future::BoxFuture;

/// Schedules a task to run once after a delay.
pub trait Scheduler: Send + Sync + 'static {
    fn schedule_once(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TaskHandle;
}

/// Cancellation handle for a scheduled task.
#[must_use = "dropping a TaskHandle detaches the task; call cancel() to stop it"]
pub struct TaskHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TaskHandle {
    /// A handle whose cancellation runs `cancel`.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle for a task that cannot be cancelled (or was never
    /// scheduled).
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Stop the task if it has not run yet.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// `Scheduler` backed by the ambient tokio runtime.
///
/// The delay uses `tokio::time::sleep`, so tests on a paused clock control
/// it. Outside a runtime the task is dropped with a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TaskHandle {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(?delay, "no tokio runtime; scheduled task dropped");
            return TaskHandle::detached();
        };
        let join = runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
        });
        let abort = join.abort_handle();
        TaskHandle::new(move || abort.abort())
    }
}
