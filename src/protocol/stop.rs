//! External stop signal for sessions.
//!
//! A [`StopHandle`] raises the signal; every [`StopSignal`] clone observes
//! it. Sessions race each suspension point against [`StopSignal::stopped`],
//! so a pending connect, settle delay, write or read is abandoned the next
//! time the session task is polled after the signal is raised.

use std::sync::Arc;

use tokio::sync::watch;

/// Raises the stop signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Raise the signal. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Check if the signal has been raised.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observes the stop signal.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Create a linked handle/signal pair.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (StopHandle, StopSignal) {
        let (tx, rx) = watch::channel(false);
        (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
    }

    /// A signal that is never raised.
    pub fn never() -> StopSignal {
        let (_handle, signal) = Self::new();
        signal
    }

    /// Check if the signal has been raised.
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal is raised.
    ///
    /// Never resolves if every [`StopHandle`] is dropped without stopping.
    pub async fn stopped(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // All handles gone; the signal can no longer be raised.
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_wakes_waiter() {
        let (handle, mut signal) = StopSignal::new();
        assert!(!signal.is_stopped());

        let waiter = tokio::spawn(async move {
            signal.stopped().await;
            signal.is_stopped()
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop();

        let observed = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("stop signal not observed")
            .unwrap();
        assert!(observed);
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_already_stopped_resolves_immediately() {
        let (handle, mut signal) = StopSignal::new();
        handle.stop();
        handle.stop();
        tokio::time::timeout(Duration::from_millis(100), signal.stopped())
            .await
            .expect("should resolve at once");
    }

    #[tokio::test]
    async fn test_never_stays_pending() {
        let mut signal = StopSignal::never();
        let result = tokio::time::timeout(Duration::from_millis(20), signal.stopped()).await;
        assert!(result.is_err());
        assert!(!signal.is_stopped());
    }
}
