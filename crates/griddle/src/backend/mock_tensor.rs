use std::fmt;

use crate::backend::Backend;

// A simple mock tensor for testing: one i32 value per row, plus an explicit
// shape whose leading dimension is the row count.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MockTensor {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: Vec<i32>,
}

impl MockTensor {
    pub fn new(shape: Vec<usize>, data: Vec<i32>) -> Self {
        Self { shape, data }
    }

    /// One value per row, shape `[rows]`.
    pub fn from_rows(data: Vec<i32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// A shapeless tensor, useful for exercising payload validation.
    pub fn scalar(value: i32) -> Self {
        Self {
            shape: vec![],
            data: vec![value],
        }
    }
}

impl fmt::Display for MockTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockTensor({:?}, {:?})", self.shape, self.data)
    }
}

impl Backend for MockTensor {
    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn cat(tensors: &[Self], dim: usize) -> Self {
        assert_eq!(dim, 0, "mock tensor only concatenates along rows");
        let mut new_shape = tensors[0].shape.clone();
        new_shape[dim] = tensors.iter().map(|t| t.shape[dim]).sum();

        let data = tensors.iter().flat_map(|t| t.data.clone()).collect();
        MockTensor::new(new_shape, data)
    }

    fn slice(&self, dim: usize, start: usize, len: usize) -> Self {
        assert_eq!(dim, 0, "mock tensor only slices along rows");
        let mut new_shape = self.shape.clone();
        new_shape[dim] = len;
        MockTensor::new(new_shape, self.data[start..start + len].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cat_concatenates_rows_in_order() {
        let a = MockTensor::from_rows(vec![1, 2]);
        let b = MockTensor::from_rows(vec![3]);
        let combined = MockTensor::cat(&[a, b], 0);

        assert_eq!(combined.shape, vec![3]);
        assert_eq!(combined.data, vec![1, 2, 3]);
    }

    #[test]
    fn slice_recovers_a_row_range() {
        let t = MockTensor::from_rows(vec![10, 20, 30, 40]);
        let middle = t.slice(0, 1, 2);

        assert_eq!(middle.shape, vec![2]);
        assert_eq!(middle.data, vec![20, 30]);
    }

    #[test]
    fn cat_preserves_trailing_dimensions() {
        let a = MockTensor::new(vec![1, 4], vec![7]);
        let b = MockTensor::new(vec![2, 4], vec![8, 9]);
        let combined = MockTensor::cat(&[a, b], 0);

        assert_eq!(combined.shape, vec![3, 4]);
    }
}
