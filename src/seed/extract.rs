//! Subset extraction for [`TileArraySeed`].
//!
//! An extraction normalizes the subset, opens one reader, issues a single multi-index
//! query and reshapes the result. Dense stores answer with values in query order.
//! Sparse stores answer with global coordinates, which are remapped to every output
//! position they occupy in the selection (duplicated indices yield several cells).
use std::collections::HashMap;

use arrow::{
    array::{Array, AsArray, RecordBatch},
    datatypes::UInt64Type,
};

use crate::{
    error::{QueryFailure, SeedError, SeedResult},
    nd_array::{
        dense::DenseNdArray, dimension::Dimension, sparse::SparseCell, sparse::SparseNdArray,
        RowMajorCoords,
    },
    store::{QueryResult, TileReader, TileStore},
    subset::Subset,
};

use super::tile::TileArraySeed;

impl<S: TileStore> TileArraySeed<S> {
    pub(super) fn extract_dense(&self, subset: &Subset) -> SeedResult<DenseNdArray> {
        self.try_extract_dense(subset)
            .map_err(|e| self.query_error(subset, e))
    }

    pub(super) fn extract_sparse(&self, subset: &Subset) -> SeedResult<SparseNdArray> {
        self.try_extract_sparse(subset)
            .map_err(|e| self.query_error(subset, e))
    }

    fn query_error(&self, subset: &Subset, source: QueryFailure) -> SeedError {
        SeedError::Query {
            path: self.path.clone(),
            attribute: self.name.clone(),
            subset: subset.to_string(),
            source,
        }
    }

    fn try_extract_dense(&self, subset: &Subset) -> Result<DenseNdArray, QueryFailure> {
        let (selections, result) = self.query(subset)?;
        match result {
            QueryResult::Dense { values } => Ok(DenseNdArray::try_new(
                values,
                self.output_dimensions(&selections),
            )?),
            QueryResult::Sparse { batch } => Ok(self
                .sparse_from_batch(&selections, &batch)?
                .to_dense_named(&self.dimension_names)?),
        }
    }

    fn try_extract_sparse(&self, subset: &Subset) -> Result<SparseNdArray, QueryFailure> {
        let (selections, result) = self.query(subset)?;
        match result {
            QueryResult::Dense { values } => {
                Ok(DenseNdArray::try_new(values, self.output_dimensions(&selections))?
                    .to_sparse()?)
            }
            QueryResult::Sparse { batch } => self.sparse_from_batch(&selections, &batch),
        }
    }

    /// Runs the single store query of an extraction. The reader lives only inside this
    /// call and is released on every path.
    fn query(&self, subset: &Subset) -> Result<(Vec<Vec<usize>>, QueryResult), QueryFailure> {
        let selections = subset.normalize(&self.shape)?;

        tracing::debug!(
            path = %self.path,
            attribute = %self.name,
            subset = %subset,
            "extracting subset"
        );

        let reader = self.store.open(&self.path)?;
        let result = reader.multi_index(&self.name, &selections)?;
        Ok((selections, result))
    }

    fn output_dimensions(&self, selections: &[Vec<usize>]) -> Vec<Dimension> {
        self.dimension_names
            .iter()
            .zip(selections)
            .map(|(name, selection)| Dimension::new(name, selection.len()))
            .collect()
    }

    fn sparse_from_batch(
        &self,
        selections: &[Vec<usize>],
        batch: &RecordBatch,
    ) -> Result<SparseNdArray, QueryFailure> {
        let extents = selections.iter().map(Vec::len).collect::<Vec<_>>();

        // Global index -> every output position it occupies, per dimension.
        let positions = selections
            .iter()
            .map(|selection| {
                let mut map: HashMap<usize, Vec<usize>> = HashMap::new();
                for (local, &global) in selection.iter().enumerate() {
                    map.entry(global).or_default().push(local);
                }
                map
            })
            .collect::<Vec<_>>();

        let coords = self
            .dimension_names
            .iter()
            .map(|name| {
                batch
                    .column_by_name(name)
                    .and_then(|c| c.as_primitive_opt::<UInt64Type>())
                    .ok_or_else(|| QueryFailure::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let values = batch
            .column_by_name(&self.name)
            .ok_or_else(|| QueryFailure::MissingColumn(self.name.clone()))?;

        let mut cells = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let local = coords
                .iter()
                .zip(&positions)
                .map(|(column, map)| {
                    if column.is_null(row) {
                        return None;
                    }
                    usize::try_from(column.value(row))
                        .ok()
                        .and_then(|global| map.get(&global))
                })
                .collect::<Option<Vec<_>>>();
            let Some(local) = local else { continue };

            let counts = local.iter().map(|p| p.len()).collect::<Vec<_>>();
            for choice in RowMajorCoords::new(&counts) {
                let output = choice
                    .iter()
                    .zip(&local)
                    .map(|(&c, p)| p[c])
                    .collect::<Vec<_>>();
                cells.push(SparseCell::new(&extents, &output, row));
            }
        }

        tracing::trace!(rows = batch.num_rows(), cells = cells.len(), "remapped sparse cells");

        Ok(SparseNdArray::from_cells(
            extents,
            self.dtype.clone(),
            cells,
            values,
        )?)
    }
}
