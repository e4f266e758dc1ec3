//! Queue-draining worker, one per registered sender.
//!
//! A worker is RUNNING until the shared shutdown token fires (or its queue is
//! closed), then STOPPED for good. Each dequeued address gets exactly one
//! remediation attempt; failures are logged and the worker moves on.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::remediation::Remediator;

/// Drain `queue` until `shutdown` fires or every producer is gone.
pub async fn run<R: Remediator>(
    sender: String,
    mut queue: mpsc::Receiver<String>,
    remediator: R,
    shutdown: CancellationToken,
) {
    tracing::debug!(sender = %sender, "Worker started");

    loop {
        let address = tokio::select! {
            // Shutdown wins over a pending address.
            biased;
            _ = shutdown.cancelled() => break,
            next = queue.recv() => match next {
                Some(address) => address,
                None => break,
            },
        };

        if let Err(e) = remediator.remediate(&address).await {
            tracing::error!(
                sender = %sender,
                recipient = %address,
                error = %e,
                "Remediation failed"
            );
        }
    }

    tracing::debug!(sender = %sender, "Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bounce_common::error::AppError;

    struct Recording {
        seen: mpsc::UnboundedSender<String>,
        fail_on: Option<&'static str>,
    }

    impl Remediator for Recording {
        async fn remediate(&self, address: &str) -> Result<(), AppError> {
            self.seen.send(address.to_string()).ok();
            match self.fail_on {
                Some(bad) if bad == address => {
                    Err(AppError::Remediation("connection refused".to_string()))
                }
                _ => Ok(()),
            }
        }
    }

    fn recording(fail_on: Option<&'static str>) -> (Recording, mpsc::UnboundedReceiver<String>) {
        let (seen, rx) = mpsc::unbounded_channel();
        (Recording { seen, fail_on }, rx)
    }

    #[tokio::test]
    async fn test_worker_processes_in_fifo_order() {
        let (tx, rx) = mpsc::channel(10);
        let (remediator, mut seen) = recording(None);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run("news@example.com".into(), rx, remediator, shutdown.clone()));

        for address in ["a@x.org", "b@x.org", "c@x.org"] {
            tx.send(address.to_string()).await.unwrap();
        }

        for expected in ["a@x.org", "b@x.org", "c@x.org"] {
            assert_eq!(seen.recv().await.unwrap(), expected);
        }

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_worker() {
        let (tx, rx) = mpsc::channel(10);
        let (remediator, mut seen) = recording(Some("bad@x.org"));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run("news@example.com".into(), rx, remediator, shutdown.clone()));

        tx.send("bad@x.org".to_string()).await.unwrap();
        tx.send("good@x.org".to_string()).await.unwrap();

        assert_eq!(seen.recv().await.unwrap(), "bad@x.org");
        assert_eq!(seen.recv().await.unwrap(), "good@x.org");
        assert!(!handle.is_finished());

        shutdown.cancel();
        handle.await.unwrap();
        // No retry of the failed address.
        assert!(seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancellation_stops_worker_with_pending_items() {
        let (tx, rx) = mpsc::channel(10);
        let (remediator, mut seen) = recording(None);
        let shutdown = CancellationToken::new();

        shutdown.cancel();
        tx.send("late@x.org".to_string()).await.unwrap();

        tokio::time::timeout(
            Duration::from_secs(1),
            run("news@example.com".into(), rx, remediator, shutdown),
        )
        .await
        .expect("worker must stop once cancelled");

        assert!(seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_queue_stops_worker() {
        let (tx, rx) = mpsc::channel::<String>(1);
        let (remediator, _seen) = recording(None);
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(1),
            run("news@example.com".into(), rx, remediator, CancellationToken::new()),
        )
        .await
        .expect("worker must stop once its queue is closed");
    }
}
