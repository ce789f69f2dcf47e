use thiserror::Error;

/// Opaque failure raised by a model backend for an entire batch.
///
/// The core assumes no structure beyond a printable message: whatever the
/// backend reports is cloned to every request that was part of the failed
/// batch. A batch that failed once is assumed likely to fail again, so the
/// core never retries; resubmission is the caller's decision.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    /// Creates a new backend error from any printable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal outcome of a request that did not produce a result.
///
/// All request failures are delivered through the same completion handle as
/// success results; there is no out-of-band error channel. The type is
/// `Clone` because a batch-level failure fans the same error out to every
/// request in the batch.
#[derive(Debug, Clone, Error)]
pub enum PredictError {
    /// The payload failed validation before entering the accumulation
    /// buffer. Only the offending request is affected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The pipeline shut down before this request could be executed, or the
    /// pipeline was torn down abruptly while the request was in flight.
    #[error("request cancelled: pipeline is shutting down")]
    Cancelled,

    /// The model backend failed for the whole batch this request ran in.
    #[error("model backend failed: {0}")]
    Backend(#[from] BackendError),
}

/// Invalid startup parameters. Fatal at construction: a pipeline with a
/// rejected configuration is never created.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A size, capacity, count, or delay field was zero.
    #[error("configuration field `{0}` must be positive")]
    NonPositive(&'static str),

    /// The number of model replicas does not match the configured world
    /// size: every worker rank needs exactly one replica.
    #[error("world size {expected} requires {expected} model replicas, got {actual}")]
    ReplicaMismatch {
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_message_is_preserved() {
        let err = BackendError::new("device lost");
        assert_eq!(err.to_string(), "device lost");
    }

    #[test]
    fn predict_error_wraps_backend_error() {
        let err: PredictError = BackendError::new("oom").into();
        assert!(matches!(err, PredictError::Backend(_)));
        assert_eq!(err.to_string(), "model backend failed: oom");
    }

    #[test]
    fn predict_error_is_cloneable_for_fan_out() {
        let err = PredictError::Backend(BackendError::new("oom"));
        let copies = vec![err.clone(), err.clone(), err];
        assert_eq!(copies.len(), 3);
    }
}
