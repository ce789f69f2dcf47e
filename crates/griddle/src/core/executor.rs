use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::backend::Backend;
use crate::communication::Pill;
use crate::core::batch::PredictionBatch;
use crate::core::dispatch::DispatchQueue;
use crate::error::PredictError;
use crate::predictor::Forward;

/// The per-rank execution loop.
///
/// Each worker owns one replicated model instance; workers are
/// data-parallel, so any worker can take any batch, and rank only selects
/// which replica runs it. The loop pops a batch, runs the replica's forward
/// pass on the combined input, and fans the output back out to the member
/// requests. A backend failure fails the whole batch - every member gets
/// the same error, and nothing is retried here.
///
/// Completion is fire-and-forget, so a caller that is slow to consume its
/// result never stalls the worker. The loop terminates when the dispatch
/// queue is closed and drained.
pub(crate) async fn execution_loop<B, O>(
    rank: usize,
    model: Arc<dyn Forward<B, O>>,
    dispatch: Arc<DispatchQueue<PredictionBatch<B, O>>>,
) where
    B: Backend,
    O: Backend,
{
    let _pill = Pill::new();
    debug!(rank, "executor online");

    while let Some(batch) = dispatch.pop().await {
        if batch.is_empty() {
            debug_assert!(false, "empty batch reached the executor");
            continue;
        }

        trace!(
            rank,
            size = batch.len(),
            rows = batch.rows(),
            age = ?batch.age(),
            "executing batch"
        );
        match model.forward(batch.combined().clone()).await {
            Ok(output) => batch.complete(output),
            Err(err) => {
                warn!(rank, size = batch.len(), %err, "batch execution failed");
                batch.fail(PredictError::Backend(err));
            }
        }
    }

    debug!(rank, "executor terminated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_tensor::MockTensor;
    use crate::core::batch::CutReason;
    use crate::communication::QueueItem;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use tokio::sync::oneshot;

    struct Doubler;

    #[async_trait]
    impl Forward<MockTensor, MockTensor> for Doubler {
        async fn forward(&self, batch: MockTensor) -> Result<MockTensor, BackendError> {
            let doubled = batch.data.iter().map(|v| v * 2).collect();
            Ok(MockTensor::new(batch.shape.clone(), doubled))
        }
    }

    struct Faulty;

    #[async_trait]
    impl Forward<MockTensor, MockTensor> for Faulty {
        async fn forward(&self, _batch: MockTensor) -> Result<MockTensor, BackendError> {
            Err(BackendError::new("interpreter crashed"))
        }
    }

    fn batch_of(
        rows: Vec<Vec<i32>>,
    ) -> (
        PredictionBatch<MockTensor, MockTensor>,
        Vec<oneshot::Receiver<Result<MockTensor, crate::error::PredictError>>>,
    ) {
        let mut items = Vec::new();
        let mut receivers = Vec::new();
        for data in rows {
            let (tx, rx) = oneshot::channel();
            items.push(QueueItem::new(MockTensor::from_rows(data), tx));
            receivers.push(rx);
        }
        (PredictionBatch::cut(items, CutReason::Size), receivers)
    }

    #[tokio::test]
    async fn executes_batches_and_splits_outputs() {
        let dispatch = Arc::new(DispatchQueue::new(4));
        let (batch, receivers) = batch_of(vec![vec![1, 2], vec![3]]);

        dispatch.push(batch).await.map_err(|_| ()).unwrap();
        dispatch.close().await;

        execution_loop(0, Arc::new(Doubler), dispatch).await;

        let mut results = Vec::new();
        for rx in receivers {
            results.push(rx.await.unwrap().unwrap().data);
        }
        assert_eq!(results, vec![vec![2, 4], vec![6]]);
    }

    #[tokio::test]
    async fn backend_failure_fails_every_member() {
        let dispatch = Arc::new(DispatchQueue::new(4));
        let (batch, receivers) = batch_of(vec![vec![1], vec![2], vec![3]]);

        dispatch.push(batch).await.map_err(|_| ()).unwrap();
        dispatch.close().await;

        execution_loop(0, Arc::new(Faulty), dispatch).await;

        for rx in receivers {
            assert!(matches!(
                rx.await.unwrap(),
                Err(crate::error::PredictError::Backend(_))
            ));
        }
    }

    #[tokio::test]
    async fn terminates_when_the_queue_closes_empty() {
        let dispatch: Arc<DispatchQueue<PredictionBatch<MockTensor, MockTensor>>> =
            Arc::new(DispatchQueue::new(4));
        dispatch.close().await;

        // Must return rather than park forever
        execution_loop(3, Arc::new(Doubler), dispatch).await;
    }
}
