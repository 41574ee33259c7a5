use tokio::sync::mpsc::{self, error::TrySendError};

use crate::reader::RawRecord;

/// Creates the bounded hand-off queue between the producer and the consumer.
///
/// `capacity` must be non-zero; [`crate::StreamConfig::validate`] enforces this.
pub(crate) fn relay(capacity: usize) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (RelaySender { tx }, RelayReceiver { rx })
}

pub(crate) struct RelaySender {
    tx: mpsc::Sender<RawRecord>,
}

impl RelaySender {
    /// Enqueues without waiting. Returns `false`, leaving the queue untouched, when
    /// it is full or the consumer is gone.
    pub(crate) fn offer(&self, record: RawRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => false,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub(crate) struct RelayReceiver {
    rx: mpsc::Receiver<RawRecord>,
}

impl RelayReceiver {
    /// Waits for the next record in FIFO order. `None` once the sender is dropped
    /// and every buffered record has been taken.
    pub(crate) async fn take(&mut self) -> Option<RawRecord> {
        self.rx.recv().await
    }

    /// Blocking variant of [`RelayReceiver::take`]; must not be called from
    /// within an async execution context.
    pub(crate) fn blocking_take(&mut self) -> Option<RawRecord> {
        self.rx.blocking_recv()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn preserves_fifo_order() {
        let (tx, mut rx) = relay(4);
        for n in 0..4 {
            assert!(tx.offer(json!({ "n": n })));
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(record) = rx.take().await {
            seen.push(record["n"].as_i64().unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn full_queue_rejects_new_record_and_keeps_old_ones() {
        let (tx, mut rx) = relay(2);
        assert!(tx.offer(json!(1)));
        assert!(tx.offer(json!(2)));
        assert!(!tx.offer(json!(3)));
        assert_eq!(rx.len(), 2);

        assert_eq!(rx.take().await, Some(json!(1)));
        assert!(tx.offer(json!(4)));
        assert_eq!(rx.take().await, Some(json!(2)));
        assert_eq!(rx.take().await, Some(json!(4)));
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn offer_after_consumer_drop_reports_closed() {
        let (tx, rx) = relay(2);
        drop(rx);
        assert!(tx.is_closed());
        assert!(!tx.offer(json!(1)));
    }
}
