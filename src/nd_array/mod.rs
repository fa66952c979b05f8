use std::{fmt::Debug, sync::Arc};

use arrow::{array::Array, datatypes::DataType, error::ArrowError};
use dimension::Dimension;

pub mod dense;
pub mod dimension;
pub mod ndarray_ext;
pub mod sparse;

#[derive(Debug, thiserror::Error)]
pub enum NdArrayError {
    #[error("Shape and inner array length do not match: expected {expected}, got {got}")]
    ShapeAndArrayLengthMismatch { expected: usize, got: usize },
    #[error("Coordinates {coords:?} do not address an array of shape {shape:?}")]
    InvalidCoordinates {
        coords: Vec<usize>,
        shape: Vec<usize>,
    },
    #[error("Expected {expected} sparse fibers for shape {shape:?}, got {got}")]
    FiberCountMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },
    #[error("Sparse fiber {fiber}: {reason}")]
    InvalidFiber { fiber: usize, reason: String },
    #[error("Sparse arrays need at least one dimension")]
    ZeroDimensional,
    #[error("Unsupported index data type: {0}")]
    UnsupportedIndexType(DataType),
    #[error("Array contains {0} null values")]
    ContainsNulls(usize),
    #[error("Data type {0} has no zero value")]
    NoZeroValue(DataType),
    #[error("Expected values of type {expected}, got {got}")]
    DataTypeMismatch { expected: DataType, got: DataType },
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// A materialized array whose values live in a single Arrow array.
pub trait NdArrowArray: Debug + Send + Sync + 'static {
    fn shape(&self) -> Vec<usize>;
    fn dimensions(&self) -> &[Dimension];
    fn array(&self) -> Arc<dyn Array>;
    fn dtype(&self) -> DataType {
        self.array().data_type().clone()
    }
    fn is_nullable(&self) -> bool {
        self.array().is_nullable()
    }
    fn len(&self) -> usize {
        self.shape().iter().product()
    }
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row-major (C order) strides for `shape`.
pub(crate) fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Iterates every coordinate of `shape` in row-major order.
pub(crate) struct RowMajorCoords {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl RowMajorCoords {
    pub(crate) fn new(shape: &[usize]) -> Self {
        let next = if shape.iter().any(|&s| s == 0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Self {
            shape: shape.to_vec(),
            next,
        }
    }
}

impl Iterator for RowMajorCoords {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for dim in (0..self.shape.len()).rev() {
            following[dim] += 1;
            if following[dim] < self.shape[dim] {
                self.next = Some(following);
                break;
            }
            following[dim] = 0;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use crate::nd_array::dense::DenseNdArray;

    use super::*;
    use arrow::array::Int32Array;

    #[test]
    fn test_shape() {
        let dims = vec![Dimension::new("dim1", 2), Dimension::new("dim2", 2)];
        let array =
            DenseNdArray::try_new(Arc::new(Int32Array::from(vec![1, 2, 3, 4])), dims).unwrap();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array.len(), 4);
        assert_eq!(array.dtype(), DataType::Int32);
    }

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(row_major_strides(&[5]), vec![1]);
        assert_eq!(row_major_strides(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_row_major_coords() {
        let coords = RowMajorCoords::new(&[2, 3]).collect::<Vec<_>>();
        assert_eq!(
            coords,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
        assert_eq!(RowMajorCoords::new(&[3, 0]).count(), 0);
    }
}
