use crate::concurrency::cancel::CancelRx;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;

/// Outcome of [`QueueRx::pop`].
#[derive(Debug, PartialEq, Eq)]
pub enum Pop<T> {
    /// The next item in FIFO order.
    Item(T),
    /// The queue was closed and every item has been taken.
    Drained,
    /// The run was cancelled; remaining items are abandoned.
    Cancelled,
}

/// Creates a bounded FIFO queue whose blocking operations also observe `cancel_rx`.
///
/// Both halves can be cloned freely. Each item is delivered to exactly one receiver.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn bounded_queue<T>(capacity: usize, cancel_rx: CancelRx) -> (QueueTx<T>, QueueRx<T>) {
    let (tx, rx) = async_channel::bounded(capacity);

    (
        QueueTx {
            tx,
            cancel_rx: cancel_rx.clone(),
        },
        QueueRx { rx, cancel_rx },
    )
}

/// Sending half of a bounded queue.
#[derive(Debug)]
pub struct QueueTx<T> {
    tx: async_channel::Sender<T>,
    cancel_rx: CancelRx,
}

impl<T> QueueTx<T> {
    /// Appends `item`, waiting while the queue is full.
    ///
    /// Fails with [`ErrorKind::Cancelled`] if the run is cancelled before space frees up. The
    /// cancellation check wins when both are ready, so nothing is enqueued after cancellation.
    pub async fn push(&mut self, item: T) -> EtlResult<()> {
        tokio::select! {
            biased;

            _ = self.cancel_rx.cancelled() => Err(etl_error!(
                ErrorKind::Cancelled,
                "Run cancelled while waiting for queue space"
            )),
            result = self.tx.send(item) => result.map_err(|_| etl_error!(
                ErrorKind::InvalidState,
                "Queue closed while producers were still running"
            )),
        }
    }

    /// Closes the queue. Receivers drain what is left and then see [`Pop::Drained`].
    ///
    /// Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    /// Number of items waiting in the queue.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

impl<T> Clone for QueueTx<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel_rx: self.cancel_rx.clone(),
        }
    }
}

/// Receiving half of a bounded queue.
#[derive(Debug)]
pub struct QueueRx<T> {
    rx: async_channel::Receiver<T>,
    cancel_rx: CancelRx,
}

impl<T> QueueRx<T> {
    /// Takes the next item, waiting while the queue is empty and still open.
    ///
    /// Cancellation is checked first, so a cancelled run stops consuming even when items remain.
    pub async fn pop(&mut self) -> Pop<T> {
        tokio::select! {
            biased;

            _ = self.cancel_rx.cancelled() => Pop::Cancelled,
            result = self.rx.recv() => match result {
                Ok(item) => Pop::Item(item),
                Err(_) => Pop::Drained,
            },
        }
    }
}

impl<T> Clone for QueueRx<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            cancel_rx: self.cancel_rx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::concurrency::cancel::create_cancel_channel;

    #[tokio::test]
    async fn closed_queue_drains_remaining_items_in_order() {
        let (_cancel_tx, cancel_rx) = create_cancel_channel();
        let (mut tx, mut rx) = bounded_queue(4, cancel_rx);

        tx.push(1).await.unwrap();
        tx.push(2).await.unwrap();
        assert!(tx.close());

        assert_eq!(rx.pop().await, Pop::Item(1));
        assert_eq!(rx.pop().await, Pop::Item(2));
        assert_eq!(rx.pop().await, Pop::Drained);
    }

    #[tokio::test]
    async fn push_blocks_while_full() {
        let (_cancel_tx, cancel_rx) = create_cancel_channel();
        let (mut tx, mut rx) = bounded_queue(1, cancel_rx);

        tx.push(1).await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), tx.push(2)).await;
        assert!(blocked.is_err());
        assert_eq!(tx.pending(), 1);

        assert_eq!(rx.pop().await, Pop::Item(1));
        tx.push(3).await.unwrap();
        assert_eq!(rx.pop().await, Pop::Item(3));
    }

    #[tokio::test]
    async fn cancellation_unblocks_full_push() {
        let (cancel_tx, cancel_rx) = create_cancel_channel();
        let (mut tx, _rx) = bounded_queue(1, cancel_rx);
        tx.push(1).await.unwrap();

        let mut blocked_tx = tx.clone();
        let handle = tokio::spawn(async move { blocked_tx.push(2).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel_tx.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_wins_over_available_items() {
        let (cancel_tx, cancel_rx) = create_cancel_channel();
        let (mut tx, mut rx) = bounded_queue(4, cancel_rx);
        tx.push(1).await.unwrap();

        cancel_tx.cancel();

        assert_eq!(rx.pop().await, Pop::Cancelled);
        assert!(tx.push(2).await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn each_item_is_delivered_once_across_receivers() {
        let (_cancel_tx, cancel_rx) = create_cancel_channel();
        let (mut tx, rx) = bounded_queue(8, cancel_rx);

        let mut consumers = Vec::new();
        for _ in 0..3 {
            let mut rx = rx.clone();
            consumers.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Pop::Item(item) = rx.pop().await {
                    seen.push(item);
                }
                seen
            }));
        }

        for i in 0..100 {
            tx.push(i).await.unwrap();
        }
        tx.close();

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort();

        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }
}
