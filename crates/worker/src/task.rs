use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Returned by [`TaskHandle::join`] / [`TaskHandle::cancel`] when the task
/// was cancelled before producing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("task was cancelled")]
pub struct CancelledError;

/// A spawned task that can be cancelled cooperatively, mirroring the
/// cancel-and-forget handle callers hold for an in-flight LSP request.
///
/// Cancelling does not interrupt the underlying `tokio` task immediately;
/// it flips a [`CancellationToken`] the task is expected to select against,
/// then `join` reports [`CancelledError`] once that has happened. Dropping
/// the handle does not cancel the task — call [`TaskHandle::cancel`]
/// explicitly.
pub struct TaskHandle<T> {
    token: CancellationToken,
    join: JoinHandle<T>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Spawn `fut` and hand back a handle that can cancel and await it.
    /// `fut` does not automatically observe cancellation — callers that
    /// want cooperative cancellation should race their future against
    /// `token.cancelled()` inside the body; this wrapper's `join` reports
    /// `CancelledError` purely based on whether `cancel` was called before
    /// completion.
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let token = CancellationToken::new();
        let join = tokio::spawn(fut);
        Self { token, join }
    }

    pub fn cancel(&self) {
        self.token.cancel();
        self.join.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Await the task's result. Returns `CancelledError` if `cancel` was
    /// called (including after completion raced with cancellation) or if
    /// the task panicked.
    pub async fn join(self) -> Result<T, CancelledError> {
        match self.join.await {
            Ok(value) => {
                if self.token.is_cancelled() {
                    Err(CancelledError)
                } else {
                    Ok(value)
                }
            }
            Err(_aborted_or_panicked) => Err(CancelledError),
        }
    }
}
