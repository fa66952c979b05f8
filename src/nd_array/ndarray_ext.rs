use std::sync::Arc;

use arrow::{
    array::{Array, AsArray},
    datatypes::ArrowPrimitiveType,
};
use ndarray::{ArrayD, IxDyn};

use super::{dense::DenseNdArray, dimension::Dimension, NdArrayError, NdArrowArray};

fn default_dimensions(shape: &[usize]) -> Vec<Dimension> {
    shape
        .iter()
        .enumerate()
        .map(|(i, &size)| Dimension::new(&format!("dim_{i}"), size))
        .collect()
}

macro_rules! impl_from_ndarray {
    ($t:ty, $arrow_array:ident) => {
        impl<D: ndarray::Dimension> From<ndarray::ArrayBase<ndarray::OwnedRepr<$t>, D>>
            for DenseNdArray
        {
            fn from(value: ndarray::ArrayBase<ndarray::OwnedRepr<$t>, D>) -> Self {
                let dimensions = default_dimensions(value.shape());
                // Logical (row-major) order, whatever the memory layout.
                let values = value.iter().cloned().collect::<Vec<_>>();
                let array = arrow::array::$arrow_array::from(values);
                DenseNdArray::new_unchecked(Arc::new(array), dimensions)
            }
        }
    };
}

macro_rules! impl_opt_from_ndarray {
    ($t:ty, $arrow_array:ident) => {
        impl<D: ndarray::Dimension> From<ndarray::ArrayBase<ndarray::OwnedRepr<Option<$t>>, D>>
            for DenseNdArray
        {
            fn from(value: ndarray::ArrayBase<ndarray::OwnedRepr<Option<$t>>, D>) -> Self {
                let dimensions = default_dimensions(value.shape());
                let values = value.iter().cloned().collect::<Vec<_>>();
                let array = arrow::array::$arrow_array::from(values);
                DenseNdArray::new_unchecked(Arc::new(array), dimensions)
            }
        }
    };
}

impl_from_ndarray!(i8, Int8Array);
impl_from_ndarray!(i16, Int16Array);
impl_from_ndarray!(i32, Int32Array);
impl_from_ndarray!(i64, Int64Array);
impl_from_ndarray!(u8, UInt8Array);
impl_from_ndarray!(u16, UInt16Array);
impl_from_ndarray!(u32, UInt32Array);
impl_from_ndarray!(u64, UInt64Array);
impl_from_ndarray!(f32, Float32Array);
impl_from_ndarray!(f64, Float64Array);
impl_from_ndarray!(bool, BooleanArray);
impl_from_ndarray!(String, StringArray);

impl_opt_from_ndarray!(i32, Int32Array);
impl_opt_from_ndarray!(i64, Int64Array);
impl_opt_from_ndarray!(f32, Float32Array);
impl_opt_from_ndarray!(f64, Float64Array);

impl DenseNdArray {
    /// Copies the values into an [`ndarray::ArrayD`] of the same shape.
    ///
    /// Fails if the values are not of type `T` or contain nulls.
    pub fn to_ndarray<T: ArrowPrimitiveType>(&self) -> Result<ArrayD<T::Native>, NdArrayError> {
        let values = self.values().as_primitive_opt::<T>().ok_or_else(|| {
            NdArrayError::DataTypeMismatch {
                expected: T::DATA_TYPE,
                got: self.values().data_type().clone(),
            }
        })?;
        if values.null_count() > 0 {
            return Err(NdArrayError::ContainsNulls(values.null_count()));
        }

        let shape = self.shape();
        ArrayD::from_shape_vec(IxDyn(&shape), values.values().to_vec()).map_err(|_| {
            NdArrayError::ShapeAndArrayLengthMismatch {
                expected: shape.iter().product(),
                got: values.len(),
            }
        })
    }
}
