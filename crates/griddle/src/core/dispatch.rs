use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

/// # DispatchQueue
///
/// The bounded hand-off point between batch formation and the executor
/// pool. Multiple producers and multiple consumers are safe; each pushed
/// value is delivered to exactly one consumer, in push order.
///
/// `push` suspends while the queue is at capacity - this is the pipeline's
/// backpressure: a saturated executor pool stalls batch formation instead
/// of growing memory without bound. `pop` suspends while the queue is
/// empty and only returns `None` once the queue has been closed *and*
/// drained, so nothing resident at close time is ever discarded.
pub(crate) struct DispatchQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Notify,
    not_full: Notify,
    capacity: usize,
}

struct Inner<T> {
    queue: VecDeque<T>,
    closed: bool,
}

impl<T> DispatchQueue<T> {
    /// Creates a queue bounded at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            capacity,
        }
    }

    /// Enqueues a value, suspending while the queue is full.
    ///
    /// Returns the value back to the caller if the queue has been closed;
    /// the caller decides how to dispose of it.
    pub async fn push(&self, value: T) -> Result<(), T> {
        loop {
            // Register for a wakeup before inspecting state, so a slot
            // freed between the check and the await is not missed.
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock().await;
                if inner.closed {
                    return Err(value);
                }
                if inner.queue.len() < self.capacity {
                    inner.queue.push_back(value);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }

            notified.await;
        }
    }

    /// Dequeues the next value, suspending while the queue is empty.
    ///
    /// Returns `None` only once the queue is closed and fully drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock().await;
                if let Some(value) = inner.queue.pop_front() {
                    self.not_full.notify_one();
                    return Some(value);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Closes the queue: pending and future `push` calls get their value
    /// back, and `pop` returns `None` once the residue is drained.
    pub async fn close(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.closed = true;
        }
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    /// Current number of queued values.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }
}
