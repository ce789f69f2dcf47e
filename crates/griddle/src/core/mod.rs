//! # Batching Core
//!
//! The core module implements the pipeline between request admission and
//! result delivery.
//!
//! ## Module Structure
//!
//! * [`batch`] - The immutable prediction batch: combined input, per-request
//!   row boundaries, and completion fan-out.
//!
//! * [`cutter`] - The background cutting loop that turns the waiting list
//!   into batches under size, latency, and shutdown conditions.
//!
//! * [`dispatch`] - The bounded queue between batch formation and the
//!   executor pool; its blocking `push` is the pipeline's backpressure.
//!
//! * [`executor`] - The per-rank execution loop: pop a batch, run the model
//!   replica, fan results out.
//!
//! * [`worker`] - Ownership and draining of the spawned background tasks.

pub(crate) mod batch;
pub(crate) mod cutter;
pub(crate) mod dispatch;
pub(crate) mod executor;
pub(crate) mod worker;
