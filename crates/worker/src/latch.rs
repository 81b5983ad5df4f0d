use std::sync::Arc;

use tokio::sync::Notify;

/// A one-shot "become ready" signal with multiple waiters, used to gate
/// requests until a server has finished its `initialize` handshake.
///
/// Unlike a plain [`tokio::sync::oneshot`], any number of tasks can call
/// [`ReadyLatch::wait`], including after [`ReadyLatch::signal`] has already
/// fired — later waiters return immediately rather than hanging forever.
#[derive(Clone)]
pub struct ReadyLatch {
    inner: Arc<Inner>,
}

struct Inner {
    notify: Notify,
    signalled: std::sync::atomic::AtomicBool,
}

impl ReadyLatch {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                notify: Notify::new(),
                signalled: std::sync::atomic::AtomicBool::new(false),
            }),
        }
    }

    /// Wake every current and future waiter. Idempotent.
    pub fn signal(&self) {
        self.inner
            .signalled
            .store(true, std::sync::atomic::Ordering::Release);
        self.inner.notify.notify_waiters();
        // Also wake a single waiter registered *after* this call via the
        // permit mechanism, since `notify_waiters` only reaches already
        // registered waiters.
        self.inner.notify.notify_one();
    }

    pub fn is_signalled(&self) -> bool {
        self.inner.signalled.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Resolve once [`ReadyLatch::signal`] has been (or is eventually)
    /// called. Safe to call before or after the signal.
    pub async fn wait(&self) {
        loop {
            if self.is_signalled() {
                return;
            }
            let notified = self.inner.notify.notified();
            // Re-check after registering interest to close the race between
            // the `is_signalled` check above and `signal` firing.
            if self.is_signalled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ReadyLatch {
    fn default() -> Self {
        Self::new()
    }
}
