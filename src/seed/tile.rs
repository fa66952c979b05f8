use std::{fmt, sync::Arc};

use arrow::datatypes::DataType;

use crate::{
    consts,
    error::{SeedError, SeedResult},
    grid::ChunkGrid,
    nd_array::{dense::DenseNdArray, sparse::SparseNdArray},
    store::{parquet::ParquetTileStore, StoreError, TileStore},
    subset::Subset,
};

use super::ArraySeed;

/// Seed over one attribute of a tile array.
///
/// Construction reads the schema once; every extraction opens its own short-lived
/// reader, so a seed holds no open handle and can be shared across threads.
pub struct TileArraySeed<S: TileStore = ParquetTileStore> {
    pub(super) store: Arc<S>,
    pub(super) path: String,
    pub(super) name: String,
    pub(super) shape: Vec<usize>,
    pub(super) dtype: DataType,
    pub(super) is_sparse: bool,
    pub(super) dimension_names: Vec<String>,
    pub(super) tile_shape: Vec<usize>,
    chunk_grid: ChunkGrid,
}

impl TileArraySeed {
    /// Opens attribute `name` of the Parquet tile array at `path`.
    pub fn open(path: &str, name: &str) -> SeedResult<Self> {
        Self::open_with_store(Arc::new(ParquetTileStore::default()), path, name)
    }
}

impl<S: TileStore> TileArraySeed<S> {
    pub fn open_with_store(store: Arc<S>, path: &str, name: &str) -> SeedResult<Self> {
        let unavailable = |source: StoreError| SeedError::StoreUnavailable {
            path: path.to_string(),
            source,
        };

        let schema = store.load_schema(path).map_err(unavailable)?;

        let dtype = schema
            .attribute(name)
            .cloned()
            .ok_or_else(|| SeedError::AttributeNotFound {
                attribute: name.to_string(),
                path: path.to_string(),
                available: schema.attribute_names().map(str::to_string).collect(),
            })?;

        let shape = schema.shape();
        let tile_shape = schema.tile_shape();
        let dimension_names = schema
            .dimensions()
            .iter()
            .map(|d| d.name.clone())
            .collect::<Vec<_>>();
        let chunk_grid =
            ChunkGrid::from_chunk_shape(&tile_shape, &shape, consts::SEED_COST_FACTOR)
                .map_err(|e| unavailable(StoreError::InvalidSchema(e.to_string())))?;

        tracing::debug!(
            path,
            attribute = name,
            shape = ?shape,
            sparse = schema.is_sparse(),
            "opened tile array seed"
        );

        Ok(Self {
            store,
            path: path.to_string(),
            name: name.to_string(),
            shape,
            dtype,
            is_sparse: schema.is_sparse(),
            dimension_names,
            tile_shape,
            chunk_grid,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the attribute exposed as the seed's values.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension_names(&self) -> &[String] {
        &self.dimension_names
    }

    pub fn tile_shape(&self) -> &[usize] {
        &self.tile_shape
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: TileStore> Clone for TileArraySeed<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            path: self.path.clone(),
            name: self.name.clone(),
            shape: self.shape.clone(),
            dtype: self.dtype.clone(),
            is_sparse: self.is_sparse,
            dimension_names: self.dimension_names.clone(),
            tile_shape: self.tile_shape.clone(),
            chunk_grid: self.chunk_grid.clone(),
        }
    }
}

impl<S: TileStore> fmt::Debug for TileArraySeed<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileArraySeed")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("is_sparse", &self.is_sparse)
            .field("dimension_names", &self.dimension_names)
            .field("tile_shape", &self.tile_shape)
            .finish_non_exhaustive()
    }
}

impl<S: TileStore> ArraySeed for TileArraySeed<S> {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> &DataType {
        &self.dtype
    }

    fn is_sparse(&self) -> bool {
        self.is_sparse
    }

    fn chunk_grid(&self) -> ChunkGrid {
        self.chunk_grid.clone()
    }

    fn extract_dense_array(&self, subset: &Subset) -> SeedResult<DenseNdArray> {
        self.extract_dense(subset)
    }

    fn extract_sparse_array(&self, subset: &Subset) -> SeedResult<SparseNdArray> {
        self.extract_sparse(subset)
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{ArrayRef, Float32Array, Float64Array, Int32Array};
    use tempfile::tempdir;

    use super::*;
    use crate::store::{
        parquet::writer::{write_dense, write_sparse},
        schema::DimensionSchema,
    };

    #[test]
    fn test_open_dense_seed() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("dense.tileparquet");
        write_dense(
            &path,
            vec![
                DimensionSchema::new("rows", 4, 2),
                DimensionSchema::new("cols", 6, 4),
            ],
            vec![
                (
                    "x",
                    Arc::new(Float32Array::from_iter_values((0..24).map(|v| v as f32)))
                        as ArrayRef,
                ),
                (
                    "n",
                    Arc::new(Int32Array::from_iter_values(0..24)) as ArrayRef,
                ),
            ],
        )?;

        let seed = TileArraySeed::open(path.to_str().unwrap(), "n")?;
        assert_eq!(seed.shape(), &[4, 6]);
        assert_eq!(seed.ndim(), 2);
        assert_eq!(seed.dtype(), &DataType::Int32);
        assert!(!seed.is_sparse());
        assert!(!seed.is_masked());
        assert_eq!(seed.name(), "n");
        assert_eq!(seed.dimension_names(), &["rows", "cols"]);
        assert_eq!(seed.tile_shape(), &[2, 4]);

        let grid = seed.chunk_grid();
        assert_eq!(grid.shape(), &[4, 6]);
        assert_eq!(grid.chunk_shape(), &[2, 4]);
        assert_eq!(grid.cost_factor(), 20.0);
        assert_eq!(grid.num_chunks(), 4);

        Ok(())
    }

    #[test]
    fn test_open_sparse_seed_uses_dimension_list() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("sparse.tileparquet");
        write_sparse(
            &path,
            vec![
                DimensionSchema::new("i", 5, 3),
                DimensionSchema::new("j", 7, 2),
                DimensionSchema::new("k", 2, 1),
            ],
            vec![vec![0], vec![6], vec![1]],
            vec![
                ("a", Arc::new(Float64Array::from(vec![1.5])) as ArrayRef),
                ("b", Arc::new(Int32Array::from(vec![2])) as ArrayRef),
            ],
        )?;

        let seed = TileArraySeed::open(path.to_str().unwrap(), "a")?;
        assert!(seed.is_sparse());
        assert_eq!(seed.shape(), &[5, 7, 2]);
        assert_eq!(seed.dtype(), &DataType::Float64);
        assert_eq!(seed.dimension_names(), &["i", "j", "k"]);
        assert_eq!(seed.tile_shape(), &[3, 2, 1]);

        let cloned = seed.clone();
        assert_eq!(cloned.path(), seed.path());
        assert!(Arc::ptr_eq(cloned.store(), seed.store()));
        Ok(())
    }

    #[test]
    fn test_missing_attribute() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("dense.tileparquet");
        write_dense(
            &path,
            vec![DimensionSchema::new("rows", 2, 2)],
            vec![("x", Arc::new(Float32Array::from(vec![1.0, 2.0])) as ArrayRef)],
        )?;

        let err = TileArraySeed::open(path.to_str().unwrap(), "temperature").unwrap_err();
        assert!(err.to_string().contains("temperature"));
        match err {
            SeedError::AttributeNotFound {
                attribute,
                available,
                ..
            } => {
                assert_eq!(attribute, "temperature");
                assert_eq!(available, vec!["x".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[test]
    fn test_store_unavailable() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nowhere.tileparquet");
        let err = TileArraySeed::open(path.to_str().unwrap(), "x").unwrap_err();
        assert!(matches!(
            err,
            SeedError::StoreUnavailable {
                source: StoreError::Io(_),
                ..
            }
        ));

        let garbage = dir.path().join("garbage.tileparquet");
        std::fs::write(&garbage, b"PAR1 but not really")?;
        let err = TileArraySeed::open(garbage.to_str().unwrap(), "x").unwrap_err();
        assert!(matches!(err, SeedError::StoreUnavailable { .. }));
        Ok(())
    }
}
