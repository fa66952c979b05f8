//! Delayed-array seeds over tiled multidimensional array stores.
//!
//! A [`TileArraySeed`](seed::TileArraySeed) reads the schema of a tile array once and
//! then materializes arbitrary per-dimension index subsets on demand, either as a
//! row-major [`DenseNdArray`](nd_array::dense::DenseNdArray) or as a fiber-indexed
//! [`SparseNdArray`](nd_array::sparse::SparseNdArray).
//!
//! ```no_run
//! use tile_array_seed::prelude::*;
//!
//! let seed = TileArraySeed::open("measurements.tileparquet", "temperature")?;
//! let block = seed.extract_dense_array(&Subset::from(vec![vec![0, 2], vec![1, 3]]))?;
//! assert_eq!(block.shape(), vec![2, 2]);
//! # Ok::<(), tile_array_seed::error::SeedError>(())
//! ```
pub mod consts;
pub mod error;
pub mod grid;
pub mod nd_array;
pub mod seed;
pub mod store;
pub mod subset;

pub mod prelude {
    pub use super::error::{QueryFailure, SeedError, SeedResult};
    pub use super::grid::{ChunkGrid, GridChunk};
    pub use super::nd_array::dense::DenseNdArray;
    pub use super::nd_array::dimension::Dimension;
    pub use super::nd_array::sparse::{SparseFiber, SparseNdArray};
    pub use super::nd_array::NdArrowArray;
    pub use super::seed::{ArraySeed, TileArraySeed};
    pub use super::store::parquet::{ParquetTileStore, ReadOptions};
    pub use super::store::{TileReader, TileStore};
    pub use super::subset::{Selection, Subset};
}
