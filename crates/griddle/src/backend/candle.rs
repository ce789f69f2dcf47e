use super::Backend;
use candle_core::Tensor;

impl Backend for Tensor {
    fn shape(&self) -> Vec<usize> {
        self.dims().to_vec()
    }

    fn cat(tensors: &[Self], dim: usize) -> Self {
        Tensor::cat(tensors, dim).unwrap()
    }

    fn slice(&self, dim: usize, start: usize, len: usize) -> Self {
        self.narrow(dim, start, len)
            .unwrap_or_else(|_| panic!("narrow: {}, {}, {:?}", start, len, self.dims()))
    }
}
