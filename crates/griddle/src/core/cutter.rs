use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::communication::{Pill, QueueItem};
use crate::config::Config;
use crate::core::batch::{CutReason, PredictionBatch};
use crate::core::dispatch::DispatchQueue;
use crate::error::PredictError;

/// The accumulation buffer shared between submitters and the cutting loop.
///
/// Submitters append under the lock; only the cutting loop drains. Once
/// `closed` is set (by the cutting loop on its way out, under the same
/// lock) no further item can be admitted, so nothing can slip in behind
/// the final drain and strand.
pub(crate) struct WaitState<B, O> {
    pub items: Vec<QueueItem<B, O>>,
    pub closed: bool,
}

impl<B, O> WaitState<B, O> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            closed: false,
        }
    }
}

/// What the cutting loop decided to do with the current buffer.
enum Step<B, O> {
    /// A cut condition fired: hand this batch to the dispatch queue
    Dispatch(PredictionBatch<B, O>),
    /// Requests are waiting but no condition fired yet: park until the
    /// latency deadline or the next arrival, whichever is first
    Sleep(Instant),
    /// Nothing is waiting: park until notified
    Park,
    /// Shutting down with an empty buffer: seal the queue and stop
    Exit,
}

/// The background cutting loop.
///
/// Converts the unbounded stream of waiting requests into bounded batches.
/// Cut conditions are evaluated in priority order: size, then latency,
/// then shutdown. The push onto the dispatch queue suspends when the queue
/// is full, which stalls further cutting - backpressure ends here, not in
/// unbounded queue growth.
pub(crate) async fn cutting_loop<B, O>(
    config: Config,
    running: Arc<AtomicBool>,
    notifier: Arc<Notify>,
    waiting: Arc<Mutex<WaitState<B, O>>>,
    dispatch: Arc<DispatchQueue<PredictionBatch<B, O>>>,
) where
    B: Backend,
    O: Backend,
{
    let _pill = Pill::new();
    debug!(max_batch_size = config.max_batch_size, "cutter online");

    loop {
        // Register for arrival notifications before inspecting the buffer,
        // so an arrival between the inspection and the park is not missed.
        let notified = notifier.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        match plan(&config, &running, &waiting).await {
            Step::Dispatch(batch) => {
                debug!(
                    size = batch.len(),
                    rows = batch.rows(),
                    reason = ?batch.reason(),
                    "batch cut"
                );
                if let Err(batch) = dispatch.push(batch).await {
                    warn!(
                        size = batch.len(),
                        "dispatch queue closed before hand-off, cancelling batch"
                    );
                    batch.fail(PredictError::Cancelled);
                }
            }
            Step::Sleep(deadline) => {
                tokio::select! {
                    _ = &mut notified => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            Step::Park => notified.await,
            Step::Exit => break,
        }
    }

    debug!("cutter terminated");
}

async fn plan<B, O>(
    config: &Config,
    running: &AtomicBool,
    waiting: &Mutex<WaitState<B, O>>,
) -> Step<B, O>
where
    B: Backend,
    O: Backend,
{
    let mut state = waiting.lock().await;

    if state.items.len() >= config.max_batch_size {
        return Step::Dispatch(cut_front(&mut state, config.max_batch_size, CutReason::Size));
    }

    if let Some(oldest) = state.items.first().map(|item| item.accepted_at()) {
        let deadline = oldest + config.max_queue_delay;
        if Instant::now() >= deadline {
            return Step::Dispatch(cut_front(
                &mut state,
                config.max_batch_size,
                CutReason::Latency,
            ));
        }
        if !running.load(Ordering::SeqCst) {
            return Step::Dispatch(cut_front(
                &mut state,
                config.max_batch_size,
                CutReason::Shutdown,
            ));
        }
        return Step::Sleep(deadline);
    }

    if !running.load(Ordering::SeqCst) {
        state.closed = true;
        return Step::Exit;
    }

    Step::Park
}

fn cut_front<B, O>(
    state: &mut WaitState<B, O>,
    max: usize,
    reason: CutReason,
) -> PredictionBatch<B, O>
where
    B: Backend,
    O: Backend,
{
    let take = max.min(state.items.len());
    let items: Vec<_> = state.items.drain(0..take).collect();
    PredictionBatch::cut(items, reason)
}
