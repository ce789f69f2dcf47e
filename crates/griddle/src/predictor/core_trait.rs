use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::Backend;
use crate::communication::Item;
use crate::error::BackendError;

/// Defines a model backend that processes one batch per forward pass.
///
/// Implementations receive the combined payload of a whole batch (member
/// payloads concatenated along the row dimension) and return an output with
/// the same number of rows; the pipeline slices the output back apart, so
/// row order must be preserved.
///
/// The pipeline invokes each instance from exactly one worker, so
/// implementations never see concurrent calls on the same instance. How an
/// instance achieves isolation or replication behind this trait - separate
/// processes, separate devices, or plain clones - is invisible to the core.
///
/// # Type Parameters
///
/// * `B` - The input tensor type, implementing [`Backend`]
/// * `O` - The output tensor type, implementing [`Backend`]
///
/// # Example
///
/// ```ignore
/// use griddle::predictor::Forward;
/// use griddle::BackendError;
/// use async_trait::async_trait;
///
/// struct MyModel {
///     weights: Tensor,
/// }
///
/// #[async_trait]
/// impl Forward<Tensor, Tensor> for MyModel {
///     async fn forward(&self, batch: Tensor) -> Result<Tensor, BackendError> {
///         batch.matmul(&self.weights).map_err(|e| BackendError::new(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait Forward<B, O>: Send + Sync
where
    B: Backend,
    O: Backend,
{
    /// Runs the model on a combined batch input.
    ///
    /// # Parameters
    ///
    /// * `batch` - The batch payload, member inputs concatenated along the
    ///   row dimension
    ///
    /// # Returns
    ///
    /// The combined output, row-aligned with the input, or a
    /// [`BackendError`] that will be fanned out to every member request.
    async fn forward(&self, batch: B) -> Result<O, BackendError>;
}

/// Shared model handles forward like the model they wrap, so one instance
/// can be handed to the pipeline and still be observed from outside.
#[async_trait]
impl<B, O, T> Forward<B, O> for Arc<T>
where
    B: Backend,
    O: Backend,
    T: Forward<B, O> + ?Sized,
{
    async fn forward(&self, batch: B) -> Result<O, BackendError> {
        self.as_ref().forward(batch).await
    }
}

/// The submission contract of the batching pipeline.
#[async_trait]
pub trait Batcher<B, O> {
    /// Submits a payload for batched execution.
    ///
    /// This method queues the input and returns an [`Item`] that resolves
    /// to the output when its batch completes, or to a
    /// [`crate::PredictError`] if the request is rejected, its batch fails,
    /// or the pipeline shuts down first.
    async fn run(&self, input: B) -> Item<O>;
}
