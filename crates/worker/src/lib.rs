//! Background task orchestration shared by the LSP layer: a cancellable
//! task handle and a one-shot readiness latch. Neither knows anything about
//! JSON-RPC or LSP; they are generic enough to reuse for any long-lived
//! child-process supervisor.

mod latch;
mod task;

pub use latch::ReadyLatch;
pub use task::{CancelledError, TaskHandle};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn ready_latch_releases_all_waiters_once() {
        let latch = ReadyLatch::new();
        let l1 = latch.clone();
        let l2 = latch.clone();

        let waiter_a = tokio::spawn(async move { l1.wait().await });
        let waiter_b = tokio::spawn(async move { l2.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        latch.signal();

        waiter_a.await.unwrap();
        waiter_b.await.unwrap();
    }

    #[tokio::test]
    async fn ready_latch_wait_returns_immediately_if_already_signalled() {
        let latch = ReadyLatch::new();
        latch.signal();
        tokio::time::timeout(Duration::from_millis(50), latch.wait())
            .await
            .expect("wait should not block once signalled");
    }

    #[tokio::test]
    async fn task_handle_cancel_stops_the_future_from_completing() {
        let handle = TaskHandle::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            42
        });
        handle.cancel();
        let result = handle.join().await;
        assert!(matches!(result, Err(CancelledError)));
    }

    #[tokio::test]
    async fn task_handle_join_returns_the_value_on_success() {
        let handle = TaskHandle::spawn(async { 7 });
        assert_eq!(handle.join().await.unwrap(), 7);
    }
}
