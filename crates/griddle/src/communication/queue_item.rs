use tokio::sync::oneshot::Sender;
use tokio::time::Instant;
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::PredictError;

/// # QueueItem
///
/// A single queued prediction request: an input payload paired with the
/// channel its result will be delivered on.
///
/// Ownership of the payload transfers to the pipeline when the item is
/// queued and is released when the item is completed. Completing an item
/// consumes it, so each request resolves at most once by construction;
/// the pipeline guarantees the "at least once" half by never dropping an
/// item without completing it.
///
/// ## Type Parameters
///
/// * `B` - The type of the input payload
/// * `O` - The type of the result that will be sent back
pub(crate) struct QueueItem<B, O> {
    /// Unique identifier, used to correlate log events
    id: Uuid,

    /// The payload to be batched and executed
    input: B,

    /// Size of the payload along the row dimension, captured once at
    /// admission
    rows: usize,

    /// When this item entered the waiting queue; drives the latency cut
    accepted_at: Instant,

    /// Channel for delivering the result or error to the requester
    sender: Sender<Result<O, PredictError>>,
}

impl<B, O> QueueItem<B, O>
where
    B: Backend,
{
    /// Creates a new `QueueItem` with the specified input and sender.
    ///
    /// # Parameters
    ///
    /// * `input` - The payload to be processed
    /// * `sender` - Channel for sending the result back to the requester
    ///
    /// # Returns
    ///
    /// A new `QueueItem` instance with a randomly generated UUID, stamped
    /// with the current time
    pub fn new(input: B, sender: Sender<Result<O, PredictError>>) -> Self {
        let rows = input.shape().first().copied().unwrap_or(0);
        Self {
            id: Uuid::new_v4(),
            input,
            rows,
            accepted_at: Instant::now(),
            sender,
        }
    }

    /// Returns the unique identifier for this item.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns a reference to the input payload.
    pub fn input(&self) -> &B {
        &self.input
    }

    /// Returns the payload's size along the row dimension.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the instant this item entered the waiting queue.
    pub fn accepted_at(&self) -> Instant {
        self.accepted_at
    }

    /// Delivers the final outcome for this request.
    ///
    /// Sending is fire-and-forget: a requester that dropped its handle is
    /// ignored, so a slow or absent caller can never stall the pipeline.
    pub fn complete(self, result: Result<O, PredictError>) {
        let _ = self.sender.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_tensor::MockTensor;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn queue_item_captures_rows() {
        let (tx, _rx) = oneshot::channel();
        let item: QueueItem<MockTensor, MockTensor> =
            QueueItem::new(MockTensor::from_rows(vec![1, 2, 3]), tx);

        assert_eq!(item.rows(), 3);
        assert_eq!(item.input().data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn complete_delivers_result() {
        let (tx, rx) = oneshot::channel();
        let item: QueueItem<MockTensor, MockTensor> =
            QueueItem::new(MockTensor::from_rows(vec![1]), tx);

        item.complete(Ok(MockTensor::from_rows(vec![2])));

        let received = rx.await.unwrap().unwrap();
        assert_eq!(received.data, vec![2]);
    }

    #[tokio::test]
    async fn complete_ignores_dropped_receiver() {
        let (tx, rx) = oneshot::channel();
        let item: QueueItem<MockTensor, MockTensor> =
            QueueItem::new(MockTensor::from_rows(vec![1]), tx);

        drop(rx);
        // Must not panic or block
        item.complete(Err(PredictError::Cancelled));
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let (tx_a, _rx_a) = oneshot::channel();
        let (tx_b, _rx_b) = oneshot::channel();
        let a: QueueItem<MockTensor, MockTensor> =
            QueueItem::new(MockTensor::from_rows(vec![1]), tx_a);
        let b: QueueItem<MockTensor, MockTensor> =
            QueueItem::new(MockTensor::from_rows(vec![1]), tx_b);

        assert_ne!(a.id(), b.id());
    }
}
