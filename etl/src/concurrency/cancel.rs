use tokio::sync::watch;

/// Transmitter side of the run-wide cancellation signal.
///
/// Cloning is cheap; every clone raises the same signal.
#[derive(Debug, Clone)]
pub struct CancelTx(watch::Sender<bool>);

impl CancelTx {
    /// Raises the signal.
    ///
    /// Returns `true` only for the call that actually raised it, so callers can tell whether
    /// they are the root cause of the cancellation.
    pub fn cancel(&self) -> bool {
        // Works without receivers, the value is stored for later subscribers.
        self.0.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    pub fn subscribe(&self) -> CancelRx {
        CancelRx(self.0.subscribe())
    }
}

/// Receiver side of the run-wide cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelRx(watch::Receiver<bool>);

impl CancelRx {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the signal is raised, immediately if it already was.
    ///
    /// Never resolves if every [`CancelTx`] is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.0.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Creates a new, not yet raised, cancellation channel.
pub fn create_cancel_channel() -> (CancelTx, CancelRx) {
    let (tx, rx) = watch::channel(false);
    (CancelTx(tx), CancelRx(rx))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn only_first_cancel_reports_raising() {
        let (tx, rx) = create_cancel_channel();

        assert!(!rx.is_cancelled());
        assert!(tx.cancel());
        assert!(!tx.clone().cancel());
        assert!(rx.is_cancelled());
        assert!(tx.is_cancelled());
    }

    #[tokio::test]
    async fn waiting_receiver_wakes_on_cancel() {
        let (tx, rx) = create_cancel_channel();

        let mut waiter = rx.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("receiver did not observe cancellation")
            .unwrap();
    }

    #[tokio::test]
    async fn late_subscriber_sees_raised_signal() {
        let (tx, _rx) = create_cancel_channel();
        tx.cancel();

        let mut late = tx.subscribe();
        tokio::time::timeout(Duration::from_secs(1), late.cancelled())
            .await
            .expect("late subscriber did not observe cancellation");
    }
}
