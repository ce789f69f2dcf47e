use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::{oneshot, Mutex, Notify};
use tracing::{debug, trace, warn};

use super::core_trait::{Batcher, Forward};
use crate::backend::Backend;
use crate::communication::{Item, QueueItem};
use crate::config::Config;
use crate::core::batch::PredictionBatch;
use crate::core::cutter::{cutting_loop, WaitState};
use crate::core::dispatch::DispatchQueue;
use crate::core::executor::execution_loop;
use crate::core::worker::TaskPool;
use crate::error::{ConfigError, PredictError};

/// # BatchPredictor
///
/// The batched inference engine: accepts individual prediction requests,
/// cuts them into batches under the configured size and latency bounds,
/// and executes each batch on one of `world_size` replicated model
/// instances.
///
/// Construction validates the configuration; [`BatchPredictor::start`]
/// spawns the background tasks (one cutting loop, one execution loop per
/// rank); [`BatchPredictor::shutdown`] drains them gracefully. Requests
/// submitted before `start` simply wait; requests submitted after
/// `shutdown` resolve immediately with a cancellation error.
pub struct BatchPredictor<B, O>
where
    B: Backend,
    O: Backend,
{
    config: Config,

    /// Cleared on shutdown; submitters check it as a fast path and the
    /// cutting loop observes it to flush and exit
    running: Arc<AtomicBool>,

    /// Wakes the cutting loop on arrivals and on shutdown
    notifier: Arc<Notify>,

    /// The accumulation buffer shared with the cutting loop
    waiting: Arc<Mutex<WaitState<B, O>>>,

    /// The bounded hand-off to the executor pool
    dispatch: Arc<DispatchQueue<PredictionBatch<B, O>>>,

    /// One replica per rank, handed to the executors by `start`
    replicas: StdMutex<Option<Vec<Arc<dyn Forward<B, O>>>>>,

    /// The spawned background tasks, taken by `shutdown` (or `Drop`)
    tasks: StdMutex<Option<TaskPool>>,
}

impl<B, O> BatchPredictor<B, O>
where
    B: Backend,
    O: Backend,
{
    /// Creates an engine over a set of replicated model instances.
    ///
    /// # Parameters
    ///
    /// * `config` - Batching parameters; rejected if any field is zero
    /// * `replicas` - One model instance per worker rank. Rank `r` in
    ///   `[0, world_size)` executes on `replicas[r]`; the pipeline never
    ///   invokes the same instance from two workers.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the configuration is invalid or the number of
    /// replicas does not match `config.world_size`.
    pub fn new<M>(config: Config, replicas: Vec<M>) -> Result<Self, ConfigError>
    where
        M: Forward<B, O> + 'static,
    {
        config.validate()?;
        if replicas.len() != config.world_size {
            return Err(ConfigError::ReplicaMismatch {
                expected: config.world_size,
                actual: replicas.len(),
            });
        }

        let replicas: Vec<Arc<dyn Forward<B, O>>> = replicas
            .into_iter()
            .map(|model| Arc::new(model) as Arc<dyn Forward<B, O>>)
            .collect();

        let dispatch = Arc::new(DispatchQueue::new(config.dispatch_capacity));

        Ok(Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
            notifier: Arc::new(Notify::new()),
            waiting: Arc::new(Mutex::new(WaitState::new())),
            dispatch,
            replicas: StdMutex::new(Some(replicas)),
            tasks: StdMutex::new(None),
        })
    }

    /// Spawns the background tasks. Idempotent: only the first call has an
    /// effect, and a call after [`BatchPredictor::shutdown`] is a no-op.
    pub fn start(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        let replicas = match self
            .replicas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            Some(replicas) => replicas,
            None => return,
        };

        debug!(
            world_size = replicas.len(),
            max_batch_size = self.config.max_batch_size,
            dispatch_capacity = self.config.dispatch_capacity,
            "starting pipeline"
        );

        let cutter = tokio::spawn(cutting_loop(
            self.config.clone(),
            self.running.clone(),
            self.notifier.clone(),
            self.waiting.clone(),
            self.dispatch.clone(),
        ));
        let executors = replicas
            .into_iter()
            .enumerate()
            .map(|(rank, model)| tokio::spawn(execution_loop(rank, model, self.dispatch.clone())))
            .collect();

        *self.tasks.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(TaskPool::new(cutter, executors));
    }

    /// Gracefully shuts the pipeline down. Idempotent.
    ///
    /// New submissions fail fast from this point on. Any partial
    /// accumulation buffer is cut and dispatched, every batch already in
    /// the dispatch queue runs to completion, and the background tasks are
    /// joined before this method returns. In-flight model invocations are
    /// never aborted.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notifier.notify_waiters();

        // Replicas of a never-started pipeline have nowhere to run
        let _ = self
            .replicas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner()).take();
        match tasks {
            Some(tasks) => {
                tasks.drain(async { self.dispatch.close().await }).await;
            }
            None => self.dispatch.close().await,
        }

        // Anything still waiting never entered a batch: fail it rather
        // than leave its handle unresolved. With a started pipeline the
        // cutter has already sealed and drained the buffer, so this only
        // finds items when the pipeline never ran.
        let stranded: Vec<QueueItem<B, O>> = {
            let mut state = self.waiting.lock().await;
            state.closed = true;
            state.items.drain(..).collect()
        };
        if !stranded.is_empty() {
            warn!(
                count = stranded.len(),
                "cancelling requests that never entered a batch"
            );
        }
        for item in stranded {
            item.complete(Err(PredictError::Cancelled));
        }

        debug!("pipeline shut down");
    }
}

#[async_trait]
impl<B, O> Batcher<B, O> for BatchPredictor<B, O>
where
    B: Backend,
    O: Backend,
{
    /// Submits a payload for batched execution.
    ///
    /// The returned [`Item`] always resolves: with the result, with
    /// [`PredictError::InvalidRequest`] if the payload fails validation,
    /// with [`PredictError::Backend`] if the batch it ran in failed, or
    /// with [`PredictError::Cancelled`] if the pipeline shut down first.
    async fn run(&self, input: B) -> Item<O> {
        let (tx, rx) = oneshot::channel();

        if !self.running.load(Ordering::SeqCst) {
            let _ = tx.send(Err(PredictError::Cancelled));
            return Item::new(rx);
        }

        let mut state = self.waiting.lock().await;
        if state.closed {
            drop(state);
            let _ = tx.send(Err(PredictError::Cancelled));
            return Item::new(rx);
        }

        if let Err(err) = validate(&input, &state) {
            drop(state);
            debug!(%err, "rejecting request");
            let _ = tx.send(Err(err));
            return Item::new(rx);
        }

        let item = QueueItem::new(input, tx);
        trace!(
            id = %item.id(),
            rows = item.rows(),
            waiting = state.items.len() + 1,
            "request queued"
        );
        state.items.push(item);
        drop(state);

        // Wake the cutting loop to re-evaluate its cut conditions
        self.notifier.notify_one();
        Item::new(rx)
    }
}

/// Pre-accumulation payload validation.
///
/// A rejected payload never touches the buffer, so neighboring requests
/// are unaffected. Beyond intrinsic checks (a payload must have rows to
/// contribute to a batch), the payload must be concatenable with whatever
/// is currently waiting: mismatched trailing dimensions cannot share a
/// batch.
fn validate<B, O>(input: &B, state: &WaitState<B, O>) -> Result<(), PredictError>
where
    B: Backend,
{
    let shape = input.shape();
    if shape.is_empty() {
        return Err(PredictError::InvalidRequest(
            "payload has no row dimension".to_string(),
        ));
    }
    if shape[0] == 0 {
        return Err(PredictError::InvalidRequest(
            "payload has zero rows".to_string(),
        ));
    }
    if let Some(first) = state.items.first() {
        let expected = first.input().shape();
        if shape[1..] != expected[1..] {
            return Err(PredictError::InvalidRequest(format!(
                "payload dimensions {:?} are incompatible with the waiting batch {:?}",
                shape, expected
            )));
        }
    }
    Ok(())
}

impl<B, O> Drop for BatchPredictor<B, O>
where
    B: Backend,
    O: Backend,
{
    /// Best-effort teardown for an engine dropped without `shutdown`: the
    /// background tasks are signalled and drained detached. Prefer calling
    /// [`BatchPredictor::shutdown`] to get a joined, fully-drained stop.
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.notifier.notify_waiters();

        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(tasks) = tasks {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let dispatch = self.dispatch.clone();
                handle.spawn(async move {
                    tasks.drain(async move { dispatch.close().await }).await;
                });
            }
        }
    }
}
