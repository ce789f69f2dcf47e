use std::time::Duration;

use crate::error::ConfigError;

/// Batching pipeline configuration.
///
/// All fields must be positive; [`Config::validate`] is checked at
/// construction and a zero anywhere prevents the pipeline from starting.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of requests per batch. Reaching this count cuts the
    /// accumulation buffer immediately.
    pub max_batch_size: usize,

    /// Maximum time a request may wait in the accumulation buffer. Once the
    /// oldest waiting request is this old the buffer is cut even if it is
    /// below `max_batch_size`, bounding tail latency under light traffic.
    pub max_queue_delay: Duration,

    /// Capacity of the dispatch queue between batch formation and the
    /// executor pool. A full queue stalls batch formation (backpressure)
    /// rather than growing memory without bound.
    pub dispatch_capacity: usize,

    /// Number of executor workers. Each rank in `[0, world_size)` owns one
    /// replicated model instance.
    pub world_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_batch_size: 32,
            max_queue_delay: Duration::from_millis(10),
            dispatch_capacity: 8,
            world_size: 1,
        }
    }
}

impl Config {
    /// Rejects configurations with any non-positive field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::NonPositive("max_batch_size"));
        }
        if self.max_queue_delay.is_zero() {
            return Err(ConfigError::NonPositive("max_queue_delay"));
        }
        if self.dispatch_capacity == 0 {
            return Err(ConfigError::NonPositive("dispatch_capacity"));
        }
        if self.world_size == 0 {
            return Err(ConfigError::NonPositive("world_size"));
        }
        Ok(())
    }
}
