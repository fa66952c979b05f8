//! Lazily evaluated array seeds.
//!
//! A seed reports its shape, element type, sparsity and chunking without touching the
//! data, and materializes a [`Subset`] on demand as either a [`DenseNdArray`] or a
//! [`SparseNdArray`].
use arrow::datatypes::DataType;

use crate::{
    error::SeedResult,
    grid::ChunkGrid,
    nd_array::{dense::DenseNdArray, sparse::SparseNdArray},
    subset::Subset,
};

mod extract;
pub mod tile;

pub use tile::TileArraySeed;

pub trait ArraySeed: Send + Sync {
    fn shape(&self) -> &[usize];

    fn dtype(&self) -> &DataType;

    fn is_sparse(&self) -> bool;

    fn is_masked(&self) -> bool {
        false
    }

    fn chunk_grid(&self) -> ChunkGrid;

    fn extract_dense_array(&self, subset: &Subset) -> SeedResult<DenseNdArray>;

    fn extract_sparse_array(&self, subset: &Subset) -> SeedResult<SparseNdArray>;

    fn ndim(&self) -> usize {
        self.shape().len()
    }
}
