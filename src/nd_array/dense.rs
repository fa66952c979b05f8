use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, ArrowPrimitiveType, BooleanArray, PrimitiveArray, Scalar},
    compute::kernels::cmp,
};

use super::{
    dimension::Dimension,
    row_major_strides,
    sparse::{zero_value, SparseCell, SparseNdArray},
    NdArrayError, NdArrowArray, RowMajorCoords,
};

/// A dense multi-dimensional Arrow array laid out in row-major order.
#[derive(Debug, Clone)]
pub struct DenseNdArray {
    /// The underlying Arrow array
    inner_array: ArrayRef,
    /// The dimensions defining the shape of this array
    dimensions: Vec<Dimension>,
}

impl DenseNdArray {
    /// Creates a new multi-dimensional array from an Arrow array and dimensions.
    ///
    /// Fails if the product of dimension sizes does not match the array length.
    pub fn try_new(
        inner_array: ArrayRef,
        dimensions: Vec<impl Into<Dimension>>,
    ) -> Result<Self, NdArrayError> {
        let dimensions: Vec<Dimension> = dimensions.into_iter().map(|d| d.into()).collect();
        let total_size: usize = dimensions.iter().map(|dim| dim.size()).product();

        if total_size != inner_array.len() {
            return Err(NdArrayError::ShapeAndArrayLengthMismatch {
                expected: total_size,
                got: inner_array.len(),
            });
        }

        Ok(Self {
            inner_array,
            dimensions,
        })
    }

    pub(crate) fn new_unchecked(inner_array: ArrayRef, dimensions: Vec<Dimension>) -> Self {
        Self {
            inner_array,
            dimensions,
        }
    }

    /// Creates a new array from a vector of primitive values
    pub fn from_vec<T: ArrowPrimitiveType>(
        vec: Vec<Option<T::Native>>,
        dimensions: Vec<impl Into<Dimension>>,
    ) -> Result<Self, NdArrayError>
    where
        PrimitiveArray<T>: From<Vec<Option<T::Native>>>,
    {
        let primitive_array = PrimitiveArray::<T>::from(vec);
        Self::try_new(Arc::new(primitive_array), dimensions)
    }

    pub fn values(&self) -> &ArrayRef {
        &self.inner_array
    }

    fn flat_index(&self, coords: &[usize]) -> Option<usize> {
        let shape = self.shape();
        if coords.len() != shape.len() || coords.iter().zip(&shape).any(|(&c, &s)| c >= s) {
            return None;
        }
        Some(
            coords
                .iter()
                .zip(row_major_strides(&shape))
                .map(|(&c, s)| c * s)
                .sum(),
        )
    }

    /// Returns the element at `coords` as a one-element slice of the values.
    pub fn get(&self, coords: &[usize]) -> Result<ArrayRef, NdArrayError> {
        let index = self
            .flat_index(coords)
            .ok_or_else(|| NdArrayError::InvalidCoordinates {
                coords: coords.to_vec(),
                shape: self.shape(),
            })?;
        Ok(self.inner_array.slice(index, 1))
    }

    /// Converts into a [`SparseNdArray`] holding every non-null, non-zero element.
    ///
    /// For data types without a zero value only null elements are dropped.
    pub fn to_sparse(&self) -> Result<SparseNdArray, NdArrayError> {
        let shape = self.shape();
        let keep = self.nonzero_mask()?;

        let mut cells = Vec::new();
        for (source, coords) in RowMajorCoords::new(&shape).enumerate() {
            if keep.is_valid(source) && keep.value(source) {
                cells.push(SparseCell::new(&shape, &coords, source));
            }
        }

        SparseNdArray::from_cells(shape, self.dtype(), cells, &self.inner_array)
    }

    fn nonzero_mask(&self) -> Result<BooleanArray, NdArrayError> {
        match zero_value(self.inner_array.data_type()) {
            Ok(zero) => Ok(cmp::neq(&self.inner_array, &Scalar::new(zero))?),
            Err(NdArrayError::NoZeroValue(_)) => {
                Ok(arrow::compute::is_not_null(self.inner_array.as_ref())?)
            }
            Err(e) => Err(e),
        }
    }
}

impl NdArrowArray for DenseNdArray {
    fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(|dim| dim.size()).collect()
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn array(&self) -> Arc<dyn Array> {
        self.inner_array.clone()
    }
}
