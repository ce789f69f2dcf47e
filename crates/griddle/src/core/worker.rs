//! Ownership of the pipeline's spawned background tasks.

use std::future::Future;

use futures::future::join_all;
use tokio::task::JoinHandle;

/// The set of background tasks a running pipeline owns: one cutting loop
/// and one execution loop per worker rank.
///
/// `TaskPool` encodes the shutdown order. The cutter must finish first (it
/// flushes the accumulation buffer into the dispatch queue), then the
/// dispatch queue is closed behind it, and only then are the executors
/// joined - they keep draining until the closed queue is empty, so every
/// batch cut before or during shutdown still runs to completion.
pub(crate) struct TaskPool {
    cutter: JoinHandle<()>,
    executors: Vec<JoinHandle<()>>,
}

impl TaskPool {
    pub fn new(cutter: JoinHandle<()>, executors: Vec<JoinHandle<()>>) -> Self {
        Self { cutter, executors }
    }

    /// Joins the pipeline tasks in shutdown order, running `close` between
    /// the cutter and the executors.
    pub async fn drain<F>(self, close: F)
    where
        F: Future<Output = ()>,
    {
        let _ = self.cutter.await;
        close.await;
        join_all(self.executors).await;
    }
}
