//! # Batched Prediction
//!
//! The public face of the pipeline. [`Forward`] is the contract a model
//! backend fulfills (one batched forward pass per invocation), [`Batcher`]
//! is the contract callers submit through, and [`BatchPredictor`] is the
//! engine wiring the two together: a batching queue, a bounded dispatch
//! queue, and one execution loop per replicated model instance.

mod batcher;
mod core_trait;

pub use core_trait::{Batcher, Forward};

pub use batcher::BatchPredictor;

pub use crate::communication::Item;
