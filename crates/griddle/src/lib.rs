//! # Griddle
//!
//! A batched inference serving core: griddle accepts a continuous stream of
//! individual prediction requests, groups them into batches under size and
//! latency constraints, runs each batch on one of several replicated model
//! instances, and fans the batch output back out to the original callers.
//!
//! ## Overview
//!
//! Serving a model one request at a time wastes accelerator throughput;
//! serving fixed-size batches adds tail latency under light traffic. Griddle
//! sits between the two: requests accumulate until either a batch-size or a
//! queuing-delay bound is hit, whichever comes first, and the cut batch is
//! handed to a pool of executor workers over a bounded queue that pushes
//! back on batch formation when execution falls behind.
//!
//! Key components include:
//!
//! - A tensor abstraction layer supporting various backends
//! - A batching queue with size, latency, and shutdown cut conditions
//! - A bounded dispatch queue between batch formation and execution
//! - A pool of executor workers, one per replicated model instance
//! - Asynchronous per-request completion handles
//!
//! ## Architecture
//!
//! ### Assumptions
//! Regardless of backend used, griddle reserves the `0th` dimension of every
//! payload as the row dimension: request payloads are concatenated along it
//! to form a batch, and batch outputs are sliced along it to recover
//! per-request results. Tensors may fill in other dimensions, but every
//! request in flight at the same time must agree on them.
//!
//! ### Backend Traits
//!
//! The [`backend::Backend`] trait defines the interface that any tensor
//! implementation must satisfy. This keeps the batching core independent of
//! the specific tensor implementation; the `candle` feature provides an
//! implementation for `candle_core::Tensor`.
//!
//! ### Prediction
//!
//! The [`predictor::Forward`] trait defines the model interface (one batched
//! forward pass per invocation), while [`predictor::Batcher`] encapsulates
//! request submission. [`predictor::BatchPredictor`] wires both to the
//! batching pipeline and owns its background tasks.
//!
//! ## Features
//!
//! - **candle** - Enables the candle tensor backend
//!
//! ## Implementation Details
//!
//! Every accepted request resolves exactly once: with its result, with the
//! error of the batch it ran in, or with a cancellation error if the
//! pipeline shut down before it was executed. Requests rejected by payload
//! validation resolve immediately and never enter a batch. Batches execute
//! in parallel across workers and may complete in any order relative to
//! their cut order; within one batch, arrival order is preserved.

mod communication;
mod core;

pub mod backend;
pub mod predictor;

mod config;
mod error;

/// Constants for client reference
pub use backend::constant;

pub use config::Config;
pub use error::{BackendError, ConfigError, PredictError};
