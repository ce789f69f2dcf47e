use tokio::time::{Duration, Instant};

use crate::backend::constant::BATCH_DIM;
use crate::backend::Backend;
use crate::communication::QueueItem;
use crate::error::{BackendError, PredictError};

/// Which cut condition closed the accumulation buffer. Checked in priority
/// order: size, then latency, then shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CutReason {
    /// The buffer reached the configured maximum batch size
    Size,
    /// The oldest waiting request reached the configured maximum delay
    Latency,
    /// The pipeline is shutting down and the partial buffer was flushed
    Shutdown,
}

/// # PredictionBatch
///
/// An ordered group of requests cut from the accumulation buffer, carrying
/// everything one executor needs: the combined input tensor, the row
/// boundaries to split the combined output back apart, and the completion
/// channel of every member request.
///
/// A batch is immutable once cut. It is consumed by exactly one executor,
/// which either completes every member with its output slice or fails every
/// member with the same error; both paths consume the batch, so no request
/// inside it can be dropped silently.
pub(crate) struct PredictionBatch<B, O> {
    /// Member requests in arrival order
    items: Vec<QueueItem<B, O>>,

    /// All member payloads concatenated along the row dimension
    combined: B,

    /// Per-member `(start, len)` row ranges into `combined`
    boundaries: Vec<(usize, usize)>,

    /// Total rows across all members
    total_rows: usize,

    /// When the cut happened
    created_at: Instant,

    /// Which condition triggered the cut
    reason: CutReason,
}

impl<B, O> PredictionBatch<B, O>
where
    B: Backend,
    O: Backend,
{
    /// Closes a drained slice of the waiting queue into an immutable batch.
    ///
    /// Member payloads are concatenated along [`BATCH_DIM`] in arrival
    /// order; the row range each member occupies is recorded so the
    /// combined output can be split back out in the same order.
    pub fn cut(items: Vec<QueueItem<B, O>>, reason: CutReason) -> Self {
        debug_assert!(!items.is_empty(), "cut of an empty buffer");

        let mut boundaries = Vec::with_capacity(items.len());
        let mut start = 0;
        for item in &items {
            boundaries.push((start, item.rows()));
            start += item.rows();
        }

        let inputs: Vec<B> = items.iter().map(|item| item.input().clone()).collect();
        let combined = B::cat(&inputs, BATCH_DIM);

        Self {
            items,
            combined,
            boundaries,
            total_rows: start,
            created_at: Instant::now(),
            reason,
        }
    }

    /// Number of requests in this batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch contains no requests. Always false for a batch
    /// produced by [`PredictionBatch::cut`].
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total rows across all member payloads.
    pub fn rows(&self) -> usize {
        self.total_rows
    }

    /// The condition that cut this batch.
    pub fn reason(&self) -> CutReason {
        self.reason
    }

    /// Time since this batch was cut.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// The combined input for a single model invocation.
    pub fn combined(&self) -> &B {
        &self.combined
    }

    /// Splits a combined output along the recorded row boundaries and
    /// fulfills every member in arrival order.
    ///
    /// An output whose row count does not match the batch is a broken
    /// backend contract; the whole batch is failed rather than delivering
    /// misaligned slices.
    pub fn complete(self, output: O) {
        let out_rows = output.shape().first().copied().unwrap_or(0);
        if out_rows != self.total_rows {
            let err = BackendError::new(format!(
                "backend returned {} rows for a {}-row batch",
                out_rows, self.total_rows
            ));
            self.fail(PredictError::Backend(err));
            return;
        }

        for (item, (start, len)) in self.items.into_iter().zip(self.boundaries) {
            let slice = output.slice(BATCH_DIM, start, len);
            item.complete(Ok(slice));
        }
    }

    /// Fails every member request with the same error.
    pub fn fail(self, err: PredictError) {
        for item in self.items {
            item.complete(Err(err.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_tensor::MockTensor;
    use tokio::sync::oneshot;

    fn item(
        rows: Vec<i32>,
    ) -> (
        QueueItem<MockTensor, MockTensor>,
        oneshot::Receiver<Result<MockTensor, PredictError>>,
    ) {
        let (tx, rx) = oneshot::channel();
        (QueueItem::new(MockTensor::from_rows(rows), tx), rx)
    }

    #[tokio::test]
    async fn cut_concatenates_in_arrival_order() {
        let (a, _rx_a) = item(vec![1, 2]);
        let (b, _rx_b) = item(vec![3]);
        let batch = PredictionBatch::cut(vec![a, b], CutReason::Size);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows(), 3);
        assert_eq!(batch.combined().data, vec![1, 2, 3]);
        assert_eq!(batch.reason(), CutReason::Size);
    }

    #[tokio::test]
    async fn complete_splits_output_by_boundaries() {
        let (a, rx_a) = item(vec![1, 2]);
        let (b, rx_b) = item(vec![3]);
        let batch = PredictionBatch::cut(vec![a, b], CutReason::Latency);

        batch.complete(MockTensor::from_rows(vec![10, 20, 30]));

        assert_eq!(rx_a.await.unwrap().unwrap().data, vec![10, 20]);
        assert_eq!(rx_b.await.unwrap().unwrap().data, vec![30]);
    }

    #[tokio::test]
    async fn fail_fans_the_same_error_to_every_member() {
        let (a, rx_a) = item(vec![1]);
        let (b, rx_b) = item(vec![2]);
        let (c, rx_c) = item(vec![3]);
        let batch = PredictionBatch::cut(vec![a, b, c], CutReason::Size);

        batch.fail(PredictError::Backend(BackendError::new("device lost")));

        for rx in [rx_a, rx_b, rx_c] {
            match rx.await.unwrap() {
                Err(PredictError::Backend(err)) => assert_eq!(err.to_string(), "device lost"),
                other => panic!("expected backend error, got {:?}", other.map(|t| t.data)),
            }
        }
    }

    #[tokio::test]
    async fn mismatched_output_rows_fail_the_batch() {
        let (a, rx_a) = item(vec![1, 2]);
        let batch = PredictionBatch::cut(vec![a], CutReason::Size);

        // Two rows in, one row out: the backend broke its contract
        batch.complete(MockTensor::from_rows(vec![10]));

        assert!(matches!(
            rx_a.await.unwrap(),
            Err(PredictError::Backend(_))
        ));
    }
}
