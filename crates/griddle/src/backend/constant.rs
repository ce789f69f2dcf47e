/// Dimension along which request payloads are concatenated into a batch and
/// batch outputs are sliced back apart.
pub const BATCH_DIM: usize = 0;
