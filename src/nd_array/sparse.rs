//! Coordinate-indexed sparse arrays.
//!
//! A [`SparseNdArray`] stores its non-default elements as *fibers*: for every position of
//! the trailing dimensions (`1..ndim`) there is at most one fiber holding the dim-0
//! indices of the stored elements, strictly increasing, together with their values.
//! Fibers are addressed by the column-major linearization of the trailing coordinates,
//! so a 2-d array has one fiber per column and a 1-d array has exactly one fiber.
use std::cmp::Reverse;

use arrow::{
    array::{Array, ArrayRef, Int8Array, UInt64Array},
    compute::{cast, concat, take},
    datatypes::DataType,
};

use super::{dense::DenseNdArray, dimension::Dimension, row_major_strides, NdArrayError};

/// The stored elements of one fiber.
#[derive(Debug, Clone)]
pub struct SparseFiber {
    indices: Vec<usize>,
    values: ArrayRef,
}

impl SparseFiber {
    pub fn new(indices: Vec<usize>, values: ArrayRef) -> Self {
        Self { indices, values }
    }

    /// Dim-0 indices of the stored elements.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// One stored element on its way into a [`SparseNdArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SparseCell {
    pub fiber: usize,
    pub index: usize,
    /// Position of the value in the source values array.
    pub source: usize,
}

impl SparseCell {
    pub(crate) fn new(shape: &[usize], coords: &[usize], source: usize) -> Self {
        Self {
            fiber: fiber_index(shape, coords),
            index: coords[0],
            source,
        }
    }
}

fn fiber_count(shape: &[usize]) -> usize {
    shape.iter().skip(1).product()
}

/// Column-major linear index of `coords[1..]` within `shape[1..]`.
fn fiber_index(shape: &[usize], coords: &[usize]) -> usize {
    let mut index = 0;
    let mut stride = 1;
    for (&c, &s) in coords.iter().zip(shape).skip(1) {
        index += c * stride;
        stride *= s;
    }
    index
}

/// Zero of `data_type` as a one-element array.
pub fn zero_value(data_type: &DataType) -> Result<ArrayRef, NdArrayError> {
    if !(data_type.is_numeric() || *data_type == DataType::Boolean) {
        return Err(NdArrayError::NoZeroValue(data_type.clone()));
    }
    Ok(cast(&Int8Array::from(vec![0i8]), data_type)?)
}

#[derive(Debug, Clone)]
pub struct SparseNdArray {
    shape: Vec<usize>,
    contents: Vec<Option<SparseFiber>>,
    dtype: DataType,
    index_dtype: DataType,
}

impl SparseNdArray {
    /// Builds a sparse array after checking that `contents` is consistent with the
    /// shape and data types.
    pub fn try_new(
        shape: Vec<usize>,
        contents: Vec<Option<SparseFiber>>,
        dtype: DataType,
        index_dtype: DataType,
    ) -> Result<Self, NdArrayError> {
        if shape.is_empty() {
            return Err(NdArrayError::ZeroDimensional);
        }
        if !matches!(index_dtype, DataType::UInt32 | DataType::UInt64) {
            return Err(NdArrayError::UnsupportedIndexType(index_dtype));
        }
        let expected = fiber_count(&shape);
        if contents.len() != expected {
            return Err(NdArrayError::FiberCountMismatch {
                shape,
                expected,
                got: contents.len(),
            });
        }

        for (fiber_idx, fiber) in contents.iter().enumerate() {
            let Some(fiber) = fiber else { continue };
            let invalid = |reason: String| NdArrayError::InvalidFiber {
                fiber: fiber_idx,
                reason,
            };
            if fiber.indices.len() != fiber.values.len() {
                return Err(invalid(format!(
                    "{} indices but {} values",
                    fiber.indices.len(),
                    fiber.values.len()
                )));
            }
            if fiber.values.data_type() != &dtype {
                return Err(NdArrayError::DataTypeMismatch {
                    expected: dtype,
                    got: fiber.values.data_type().clone(),
                });
            }
            if fiber.indices.windows(2).any(|w| w[0] >= w[1]) {
                return Err(invalid("indices are not strictly increasing".to_string()));
            }
            if let Some(&last) = fiber.indices.last() {
                if last >= shape[0] {
                    return Err(invalid(format!(
                        "index {} out of bounds for extent {}",
                        last, shape[0]
                    )));
                }
            }
        }

        Ok(Self::new_unchecked(shape, contents, dtype, index_dtype))
    }

    /// Builds a sparse array without validating `contents`; the caller guarantees it is
    /// well-formed.
    pub fn new_unchecked(
        shape: Vec<usize>,
        contents: Vec<Option<SparseFiber>>,
        dtype: DataType,
        index_dtype: DataType,
    ) -> Self {
        Self {
            shape,
            contents,
            dtype,
            index_dtype,
        }
    }

    /// An array of `shape` with no stored elements.
    pub fn empty(shape: Vec<usize>, dtype: DataType) -> Self {
        let contents = vec![None; fiber_count(&shape)];
        let index_dtype = Self::index_dtype_for(shape.first().copied().unwrap_or(0));
        Self::new_unchecked(shape, contents, dtype, index_dtype)
    }

    /// Narrowest unsigned index type able to address `extent` positions.
    pub fn index_dtype_for(extent: usize) -> DataType {
        if u32::try_from(extent).is_ok() {
            DataType::UInt32
        } else {
            DataType::UInt64
        }
    }

    /// Groups `cells` into fibers, gathering their values from `values`.
    ///
    /// When several cells address the same position the one with the highest `source`
    /// row wins.
    pub(crate) fn from_cells(
        shape: Vec<usize>,
        dtype: DataType,
        mut cells: Vec<SparseCell>,
        values: &ArrayRef,
    ) -> Result<Self, NdArrayError> {
        if values.data_type() != &dtype {
            return Err(NdArrayError::DataTypeMismatch {
                expected: dtype,
                got: values.data_type().clone(),
            });
        }

        cells.sort_unstable_by_key(|cell| (cell.fiber, cell.index, Reverse(cell.source)));
        cells.dedup_by_key(|cell| (cell.fiber, cell.index));
        let take_indices =
            UInt64Array::from_iter_values(cells.iter().map(|cell| cell.source as u64));
        let gathered = take(values.as_ref(), &take_indices, None)?;

        let mut contents: Vec<Option<SparseFiber>> = vec![None; fiber_count(&shape)];
        let mut start = 0;
        while start < cells.len() {
            let fiber = cells[start].fiber;
            let len = cells[start..]
                .iter()
                .take_while(|cell| cell.fiber == fiber)
                .count();
            let indices = cells[start..start + len]
                .iter()
                .map(|cell| cell.index)
                .collect();
            contents[fiber] = Some(SparseFiber::new(indices, gathered.slice(start, len)));
            start += len;
        }

        let index_dtype = Self::index_dtype_for(shape[0]);
        Ok(Self::new_unchecked(shape, contents, dtype, index_dtype))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    pub fn index_dtype(&self) -> &DataType {
        &self.index_dtype
    }

    pub fn contents(&self) -> &[Option<SparseFiber>] {
        &self.contents
    }

    pub fn fiber(&self, fiber: usize) -> Option<&SparseFiber> {
        self.contents.get(fiber).and_then(|f| f.as_ref())
    }

    /// Number of stored elements.
    pub fn nnz(&self) -> usize {
        self.contents.iter().flatten().map(|f| f.len()).sum()
    }

    /// Coordinates of the trailing dimensions addressed by fiber `fiber`.
    fn fiber_coords(&self, mut fiber: usize) -> Vec<usize> {
        self.shape
            .iter()
            .skip(1)
            .map(|&s| {
                let c = fiber % s;
                fiber /= s;
                c
            })
            .collect()
    }

    /// Returns the stored element at `coords` as a one-element slice, or `None` when
    /// the position holds the default value.
    pub fn get(&self, coords: &[usize]) -> Result<Option<ArrayRef>, NdArrayError> {
        if coords.len() != self.shape.len()
            || coords.iter().zip(&self.shape).any(|(&c, &s)| c >= s)
        {
            return Err(NdArrayError::InvalidCoordinates {
                coords: coords.to_vec(),
                shape: self.shape.clone(),
            });
        }

        Ok(self
            .fiber(fiber_index(&self.shape, coords))
            .and_then(|fiber| {
                fiber
                    .indices
                    .binary_search(&coords[0])
                    .ok()
                    .map(|pos| fiber.values.slice(pos, 1))
            }))
    }

    /// Every stored element with its full coordinates, fiber by fiber.
    pub fn entries(&self) -> impl Iterator<Item = (Vec<usize>, ArrayRef)> + '_ {
        self.contents
            .iter()
            .enumerate()
            .filter_map(|(idx, fiber)| fiber.as_ref().map(|f| (idx, f)))
            .flat_map(move |(idx, fiber)| {
                let trailing = self.fiber_coords(idx);
                fiber.indices.iter().enumerate().map(move |(pos, &row)| {
                    let mut coords = Vec::with_capacity(trailing.len() + 1);
                    coords.push(row);
                    coords.extend_from_slice(&trailing);
                    (coords, fiber.values.slice(pos, 1))
                })
            })
    }

    /// Densifies into a row-major array, filling unset positions with zero.
    pub fn to_dense(&self) -> Result<DenseNdArray, NdArrayError> {
        let names = (0..self.shape.len())
            .map(|i| format!("dim_{i}"))
            .collect::<Vec<_>>();
        self.to_dense_named(&names)
    }

    /// Like [`SparseNdArray::to_dense`], naming the dimensions of the result.
    pub fn to_dense_named<S: AsRef<str>>(&self, names: &[S]) -> Result<DenseNdArray, NdArrayError> {
        let zero = zero_value(&self.dtype)?;
        let strides = row_major_strides(&self.shape);
        let total: usize = self.shape.iter().product();

        // Index 0 of the pool is the zero value, fiber values follow.
        let mut pool: Vec<&dyn Array> = vec![zero.as_ref()];
        let mut take_indices = vec![0u64; total];
        let mut offset = 1u64;
        for (idx, fiber) in self.contents.iter().enumerate() {
            let Some(fiber) = fiber else { continue };
            let base: usize = self
                .fiber_coords(idx)
                .iter()
                .zip(strides.iter().skip(1))
                .map(|(c, s)| c * s)
                .sum();
            for (pos, &row) in fiber.indices.iter().enumerate() {
                take_indices[row * strides[0] + base] = offset + pos as u64;
            }
            offset += fiber.values.len() as u64;
            pool.push(fiber.values.as_ref());
        }

        let pool = concat(&pool)?;
        let values = take(pool.as_ref(), &UInt64Array::from(take_indices), None)?;
        let dimensions = names
            .iter()
            .zip(&self.shape)
            .map(|(name, &size)| Dimension::new(name.as_ref(), size))
            .collect::<Vec<_>>();

        DenseNdArray::try_new(values, dimensions)
    }
}
