use std::fmt::{Debug, Display};

/// The trait that must be fulfilled by any tensor type to support batching.
///
/// The pipeline needs exactly three capabilities from a payload: report its
/// shape, concatenate several payloads into one along the row dimension,
/// and slice a contiguous row range back out of a combined output. Anything
/// satisfying these can flow through the batching core unchanged.
pub trait Backend: Debug + Display + Clone + Send + Sync + 'static {
    /// Return the shape of this tensor
    fn shape(&self) -> Vec<usize>;

    /// Concatenate several tensors to each other along dimension `dim`, in
    /// the order supplied
    fn cat(tensors: &[Self], dim: usize) -> Self;

    /// Slice a given `dim` from `start` to `start + len`
    fn slice(&self, dim: usize, start: usize, len: usize) -> Self;
}
